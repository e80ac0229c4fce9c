// ============================================================
// Layer 5 — LSTM Autoencoder
// ============================================================
// The ECG model: a stacked LSTM encoder and a stacked LSTM
// decoder. Module field names line up with the state dict, so
// loading a checkpoint is a key remap, never a reshape.

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
};

use crate::domain::contract::ArchitectureDescriptor;
use crate::ml::lstm::{LstmLayer, LstmLayerConfig};

// ─── StackedLstm ─────────────────────────────────────────────────────────────
// `num_layers` LSTM layers; layer 0 maps d_input → d_hidden, the
// rest map d_hidden → d_hidden. Dropout sits between layers and
// is inert on a backend without autodiff.
#[derive(Config, Debug)]
pub struct StackedLstmConfig {
    pub d_input:    usize,
    pub d_hidden:   usize,
    pub num_layers: usize,
    #[config(default = 0.0)]
    pub dropout:    f64,
}

impl StackedLstmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> StackedLstm<B> {
        let layers = self
            .layer_configs()
            .iter()
            .map(|cfg| cfg.init(device))
            .collect();
        let dropout = DropoutConfig::new(self.dropout).init();
        StackedLstm { layers, dropout }
    }

    pub fn layer_configs(&self) -> Vec<LstmLayerConfig> {
        (0..self.num_layers)
            .map(|idx| {
                let d_input = if idx == 0 { self.d_input } else { self.d_hidden };
                LstmLayerConfig::new(d_input, self.d_hidden)
            })
            .collect()
    }
}

#[derive(Module, Debug)]
pub struct StackedLstm<B: Backend> {
    pub layers:  Vec<LstmLayer<B>>,
    pub dropout: Dropout,
}

impl<B: Backend> StackedLstm<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut x = x;
        for (idx, layer) in self.layers.iter().enumerate() {
            if idx > 0 {
                x = self.dropout.forward(x);
            }
            x = layer.forward(x);
        }
        x
    }
}

// ─── LstmAutoencoder ─────────────────────────────────────────────────────────
// Two stacked recurrent stages:
//   encoder: [batch, seq, features] → [batch, seq, hidden]
//   decoder: [batch, seq, hidden]   → [batch, seq, features]
// The encoder's final (h, c) state is discarded; the decoder only
// sees the per-step encoder outputs.
#[derive(Config, Debug)]
pub struct LstmAutoencoderConfig {
    #[config(default = 1)]
    pub input_size:  usize,
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 2)]
    pub num_layers:  usize,
    #[config(default = 0.0)]
    pub dropout:     f64,
}

/// One LSTM layer of the autoencoder, named the way the state dict names it.
#[derive(Debug, Clone)]
pub struct LayerSlot {
    pub stage:  &'static str,
    pub index:  usize,
    pub config: LstmLayerConfig,
}

impl LayerSlot {
    /// `encoder.weight_ih_l0` style key prefix without the parameter part.
    pub fn state_dict_key(&self, param: &str) -> String {
        format!("{}.{}_l{}", self.stage, param, self.index)
    }
}

impl LstmAutoencoderConfig {
    pub fn encoder(&self) -> StackedLstmConfig {
        StackedLstmConfig::new(self.input_size, self.hidden_size, self.num_layers)
            .with_dropout(self.dropout)
    }

    pub fn decoder(&self) -> StackedLstmConfig {
        StackedLstmConfig::new(self.hidden_size, self.input_size, self.num_layers)
            .with_dropout(self.dropout)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmAutoencoder<B> {
        LstmAutoencoder {
            encoder: self.encoder().init(device),
            decoder: self.decoder().init(device),
        }
    }

    /// Every layer in execution order: encoder layers, then decoder layers.
    pub fn layer_slots(&self) -> Vec<LayerSlot> {
        let stage = |name: &'static str, cfg: StackedLstmConfig| {
            cfg.layer_configs()
                .into_iter()
                .enumerate()
                .map(move |(index, config)| LayerSlot { stage: name, index, config })
        };
        stage("encoder", self.encoder())
            .chain(stage("decoder", self.decoder()))
            .collect()
    }

    pub fn descriptor(&self) -> ArchitectureDescriptor {
        ArchitectureDescriptor {
            input_size:  self.input_size,
            hidden_size: self.hidden_size,
            num_layers:  self.num_layers,
        }
    }
}

impl From<&ArchitectureDescriptor> for LstmAutoencoderConfig {
    fn from(arch: &ArchitectureDescriptor) -> Self {
        LstmAutoencoderConfig::new()
            .with_input_size(arch.input_size)
            .with_hidden_size(arch.hidden_size)
            .with_num_layers(arch.num_layers)
    }
}

#[derive(Module, Debug)]
pub struct LstmAutoencoder<B: Backend> {
    pub encoder: StackedLstm<B>,
    pub decoder: StackedLstm<B>,
}

impl<B: Backend> LstmAutoencoder<B> {
    /// x: [batch, seq_len, features] → reconstruction of the same shape
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let encoded = self.encoder.forward(x);
        self.decoder.forward(encoded)
    }

    /// Layers paired with their slot, encoder first.
    pub fn layers<'a>(
        &'a self,
        config: &LstmAutoencoderConfig,
    ) -> Vec<(LayerSlot, &'a LstmLayer<B>)> {
        config
            .layer_slots()
            .into_iter()
            .zip(self.encoder.layers.iter().chain(self.decoder.layers.iter()))
            .collect()
    }

    /// Compare every parameter against the shape `config` expects.
    /// Returns one line per problem; empty means the model fits.
    pub fn shape_mismatches(&self, config: &LstmAutoencoderConfig) -> Vec<String> {
        let slots    = config.layer_slots();
        let expected = slots.len();
        let actual   = self.encoder.layers.len() + self.decoder.layers.len();
        if expected != actual {
            return vec![format!("expected {expected} LSTM layers, found {actual}")];
        }

        let mut problems = Vec::new();
        for (slot, layer) in self.layers(config) {
            let wanted = slot.config.parameter_shapes();
            let found  = layer.parameter_shapes();
            for ((name, want), (_, have)) in wanted.iter().zip(found.iter()) {
                if want != have {
                    problems.push(format!(
                        "{}: expected {:?}, found {:?}",
                        slot.state_dict_key(name), want, have
                    ));
                }
            }
        }
        problems
    }
}
