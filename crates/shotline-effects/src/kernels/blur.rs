use shotline_core::{EffectCategory, EffectParameter, KernelKind, ParamValue, ParamValues};
use shotline_gpu::ShaderComplexity;

use crate::kernel::{param_f64, EffectKernel, StageDesc, StageOp};

/// Largest radius the parametrized kernel is built for.
pub const MAX_RADIUS: u32 = 64;

/// Normalized 2D Gaussian weights for a `(2r+1)²` kernel.
pub fn gaussian_weights(radius: u32) -> Vec<f32> {
    let size = 2 * radius + 1;
    let sigma = (radius as f32 / 2.0).max(0.5);
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut weights = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - radius as f32;
            let dy = y as f32 - radius as f32;
            weights.push((-(dx * dx + dy * dy) / two_sigma_sq).exp());
        }
    }
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Box blur at low complexity, Gaussian otherwise.
pub struct Blur;

impl EffectKernel for Blur {
    fn kind(&self) -> KernelKind {
        KernelKind::Blur
    }

    fn name(&self) -> &str {
        "Blur"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Blur
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new(
            "radius",
            ParamValue::Range {
                value: 2.0,
                min: 0.0,
                max: 32.0,
            },
        )]
    }

    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let radius = param_f64(params, "radius", 2.0);
        let (size, weights) = if !radius.is_finite() {
            // Carried through so validation rejects the stage
            (1, vec![f32::NAN])
        } else if radius < 0.5 {
            (1, vec![1.0])
        } else {
            match complexity {
                ShaderComplexity::Low => (3, vec![1.0 / 9.0; 9]),
                ShaderComplexity::Medium | ShaderComplexity::High => {
                    let r = (radius.round() as u32).min(MAX_RADIUS);
                    (2 * r + 1, gaussian_weights(r))
                }
            }
        };
        StageDesc::new(
            self.kind().id(),
            StageOp::Convolve { size, weights },
            complexity,
        )
    }
}
