// ============================================================
// Layer 5 — Bidirectional GRU over the Day Axis
// ============================================================
// Single-layer gated recurrent unit built from Linear gates,
// run once forward and once backward over the day sequence.
// The two direction-states are concatenated per day, so the
// output feature width is 2 × gru_dim.
//
// Gate formulation follows the reference recurrent stack:
//   z = σ(Wz·x + Uz·h)
//   r = σ(Wr·x + Ur·h)
//   n = tanh(Wn·x + r ⊙ (Un·h))
//   h' = (1 − z) ⊙ n + z ⊙ h
//
// Reference: Cho et al. (2014) - gated recurrent units

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation,
};

#[derive(Config, Debug)]
pub struct BiGruConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl BiGruConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BiGru<B> {
        BiGru {
            forward_cell:  self.build_cell(device),
            backward_cell: self.build_cell(device),
            d_hidden:      self.d_hidden,
        }
    }

    fn build_cell<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        GruCell {
            update_x: LinearConfig::new(self.d_input, self.d_hidden).init(device),
            update_h: LinearConfig::new(self.d_hidden, self.d_hidden).init(device),
            reset_x:  LinearConfig::new(self.d_input, self.d_hidden).init(device),
            reset_h:  LinearConfig::new(self.d_hidden, self.d_hidden).init(device),
            cand_x:   LinearConfig::new(self.d_input, self.d_hidden).init(device),
            cand_h:   LinearConfig::new(self.d_hidden, self.d_hidden).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    pub update_x: Linear<B>,
    pub update_h: Linear<B>,
    pub reset_x:  Linear<B>,
    pub reset_h:  Linear<B>,
    pub cand_x:   Linear<B>,
    pub cand_h:   Linear<B>,
}

impl<B: Backend> GruCell<B> {
    /// One recurrence step. x: [batch, d_input], h: [batch, d_hidden]
    /// → next state [batch, d_hidden].
    pub fn step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let z = activation::sigmoid(self.update_x.forward(x.clone()) + self.update_h.forward(h.clone()));
        let r = activation::sigmoid(self.reset_x.forward(x.clone()) + self.reset_h.forward(h.clone()));
        // Reset gate scales the projected previous state.
        let n = activation::tanh(self.cand_x.forward(x) + r * self.cand_h.forward(h.clone()));
        (h.ones_like() - z.clone()) * n + z * h
    }
}

#[derive(Module, Debug)]
pub struct BiGru<B: Backend> {
    pub forward_cell:  GruCell<B>,
    pub backward_cell: GruCell<B>,
    pub d_hidden:      usize,
}

impl<B: Backend> BiGru<B> {
    /// x: [batch, days, d_input] → per-day states [batch, days, 2 × d_hidden]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let forward_states = self.run(&self.forward_cell, x.clone());
        // Reverse the day axis, run, then restore the original order
        // so both direction-states align per day.
        let backward_states = self.run(&self.backward_cell, x.flip([1])).flip([1]);
        Tensor::cat(vec![forward_states, backward_states], 2)
    }

    fn run(&self, cell: &GruCell<B>, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch_size, steps, d_input] = x.dims();
        let device = x.device();

        let mut h = Tensor::zeros([batch_size, self.d_hidden], &device);
        let mut states = Vec::with_capacity(steps);
        for t in 0..steps {
            let x_t = x.clone()
                .slice([0..batch_size, t..t + 1, 0..d_input])
                .reshape([batch_size, d_input]);
            h = cell.step(x_t, h);
            states.push(h.clone());
        }
        Tensor::stack::<3>(states, 1)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
