// ============================================================
// Layer 5 — LSTM Layer
// ============================================================
// A single batch-first LSTM layer whose parameters are laid out
// exactly like a PyTorch `nn.LSTM` layer:
//
//   weight_ih  [4H, In]   gate rows ordered i, f, g, o
//   weight_hh  [4H, H]
//   bias_ih    [4H]
//   bias_hh    [4H]
//
// Keeping the fused layout (instead of one Linear per gate)
// lets a state dict load without splitting tensors, and lets
// the ONNX lowering reorder gate blocks with plain slicing.
//
// Per time step:
//   gates = x_t·W_ihᵀ + b_ih + h·W_hhᵀ + b_hh
//   c     = σ(f)⊙c + σ(i)⊙tanh(g)
//   h     = σ(o)⊙tanh(c)

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
    tensor::activation::sigmoid,
};

#[derive(Config, Debug)]
pub struct LstmLayerConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl LstmLayerConfig {
    /// Uniform(-1/√H, 1/√H), the same initialisation torch uses.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmLayer<B> {
        let bound = 1.0 / (self.d_hidden as f64).sqrt();
        let init  = Initializer::Uniform { min: -bound, max: bound };
        let gates = 4 * self.d_hidden;
        LstmLayer {
            weight_ih: init.init([gates, self.d_input], device),
            weight_hh: init.init([gates, self.d_hidden], device),
            bias_ih:   init.init([gates], device),
            bias_hh:   init.init([gates], device),
            d_hidden:  self.d_hidden,
        }
    }

    /// Parameter name and shape, in state-dict order.
    pub fn parameter_shapes(&self) -> [(&'static str, Vec<usize>); 4] {
        let gates = 4 * self.d_hidden;
        [
            ("weight_ih", vec![gates, self.d_input]),
            ("weight_hh", vec![gates, self.d_hidden]),
            ("bias_ih",   vec![gates]),
            ("bias_hh",   vec![gates]),
        ]
    }
}

#[derive(Module, Debug)]
pub struct LstmLayer<B: Backend> {
    pub weight_ih: Param<Tensor<B, 2>>,
    pub weight_hh: Param<Tensor<B, 2>>,
    pub bias_ih:   Param<Tensor<B, 1>>,
    pub bias_hh:   Param<Tensor<B, 1>>,
    pub d_hidden:  usize,
}

impl<B: Backend> LstmLayer<B> {
    /// Actual parameter shapes, same order as `LstmLayerConfig::parameter_shapes`.
    pub fn parameter_shapes(&self) -> [(&'static str, Vec<usize>); 4] {
        [
            ("weight_ih", self.weight_ih.val().dims().to_vec()),
            ("weight_hh", self.weight_hh.val().dims().to_vec()),
            ("bias_ih",   self.bias_ih.val().dims().to_vec()),
            ("bias_hh",   self.bias_hh.val().dims().to_vec()),
        ]
    }

    /// x: [batch, seq_len, d_input] → [batch, seq_len, d_hidden]
    /// Zero initial hidden and cell state.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, seq_len, d_input] = x.dims();
        let h      = self.d_hidden;
        let device = x.device();

        if seq_len == 0 {
            return Tensor::zeros([batch, 0, h], &device);
        }

        let w_ih = self.weight_ih.val().transpose(); // [In, 4H]
        let w_hh = self.weight_hh.val().transpose(); // [H, 4H]
        let bias = (self.bias_ih.val() + self.bias_hh.val()).unsqueeze::<2>(); // [1, 4H]

        // The input projection does not depend on the recurrence, so do
        // it for every time step in one matmul.
        let projected = x
            .reshape([batch * seq_len, d_input])
            .matmul(w_ih)
            .add(bias)
            .reshape([batch, seq_len, 4 * h]);

        let mut hidden = Tensor::<B, 2>::zeros([batch, h], &device);
        let mut cell   = Tensor::<B, 2>::zeros([batch, h], &device);
        let mut steps  = Vec::with_capacity(seq_len);

        for t in 0..seq_len {
            let gates = projected
                .clone()
                .slice([0..batch, t..t + 1, 0..4 * h])
                .reshape([batch, 4 * h])
                + hidden.matmul(w_hh.clone());

            let input_gate  = sigmoid(gates.clone().narrow(1, 0, h));
            let forget_gate = sigmoid(gates.clone().narrow(1, h, h));
            let cell_gate   = gates.clone().narrow(1, 2 * h, h).tanh();
            let output_gate = sigmoid(gates.narrow(1, 3 * h, h));

            cell   = forget_gate * cell + input_gate * cell_gate;
            hidden = output_gate * cell.clone().tanh();
            steps.push(hidden.clone());
        }

        Tensor::stack::<3>(steps, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn constant_layer(d_input: usize, d_hidden: usize, value: f32) -> LstmLayer<TestBackend> {
        let device = Default::default();
        let gates  = 4 * d_hidden;
        LstmLayer {
            weight_ih: Param::from_tensor(Tensor::full([gates, d_input], value, &device)),
            weight_hh: Param::from_tensor(Tensor::full([gates, d_hidden], value, &device)),
            bias_ih:   Param::from_tensor(Tensor::zeros([gates], &device)),
            bias_hh:   Param::from_tensor(Tensor::zeros([gates], &device)),
            d_hidden,
        }
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let layer  = LstmLayerConfig::new(3, 5).init::<TestBackend>(&device);
        let x      = Tensor::<TestBackend, 3>::ones([2, 7, 3], &device);
        assert_eq!(layer.forward(x).dims(), [2, 7, 5]);
    }

    #[test]
    fn test_zero_weights_give_zero_output() {
        // All gates sit at σ(0) = 0.5 and g = tanh(0) = 0, so the cell never charges
        let layer = constant_layer(1, 4, 0.0);
        let x     = Tensor::<TestBackend, 3>::ones([1, 10, 1], &Default::default());
        let out: Vec<f32> = layer.forward(x).into_data().to_vec().unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_step_matches_hand_computation() {
        let layer = constant_layer(1, 1, 1.0);
        let x     = Tensor::<TestBackend, 3>::ones([1, 1, 1], &Default::default());
        let out: Vec<f32> = layer.forward(x).into_data().to_vec().unwrap();

        let s = |v: f32| 1.0 / (1.0 + (-v).exp());
        let c = s(1.0) * 1.0_f32.tanh();
        let h = s(1.0) * c.tanh();
        assert!((out[0] - h).abs() < 1e-6, "got {} expected {}", out[0], h);
    }

    #[test]
    fn test_batch_rows_are_independent() {
        let device = Default::default();
        let layer  = LstmLayerConfig::new(1, 3).init::<TestBackend>(&device);
        let a = Tensor::<TestBackend, 3>::random([1, 6, 1], burn::tensor::Distribution::Default, &device);
        let b = Tensor::<TestBackend, 3>::random([1, 6, 1], burn::tensor::Distribution::Default, &device);

        let alone: Vec<f32>   = layer.forward(a.clone()).into_data().to_vec().unwrap();
        let batched: Vec<f32> = layer
            .forward(Tensor::cat(vec![a, b], 0))
            .slice([0..1, 0..6, 0..3])
            .into_data()
            .to_vec()
            .unwrap();
        for (x, y) in alone.iter().zip(batched.iter()) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_parameter_shapes_match_config() {
        let cfg   = LstmLayerConfig::new(2, 6);
        let layer = cfg.init::<TestBackend>(&Default::default());
        assert_eq!(layer.parameter_shapes(), cfg.parameter_shapes());
    }
}
