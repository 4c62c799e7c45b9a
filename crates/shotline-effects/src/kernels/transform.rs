//! Geometric kernels. Transforms act in centre-origin pixel coordinates.

use glam::Vec2;
use shotline_core::{
    EffectCategory, EffectParameter, KernelKind, ParamValue, ParamValues, Transform2D,
};
use shotline_gpu::ShaderComplexity;

use crate::kernel::{param_f64, EffectKernel, StageDesc, StageOp};

pub struct Scale;

impl EffectKernel for Scale {
    fn kind(&self) -> KernelKind {
        KernelKind::Scale
    }

    fn name(&self) -> &str {
        "Scale"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Transform
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new(
            "scale",
            ParamValue::Range {
                value: 1.0,
                min: 0.1,
                max: 4.0,
            },
        )]
    }

    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let s = param_f64(params, "scale", 1.0) as f32;
        let t = Transform2D::from_trs_about(Vec2::ZERO, Vec2::ZERO, 0.0, Vec2::splat(s));
        StageDesc::new(self.kind().id(), StageOp::Transform(t), complexity)
    }
}

pub struct Rotation;

impl EffectKernel for Rotation {
    fn kind(&self) -> KernelKind {
        KernelKind::Rotation
    }

    fn name(&self) -> &str {
        "Rotation"
    }

    fn category(&self) -> EffectCategory {
        EffectCategory::Transform
    }

    fn parameters(&self) -> Vec<EffectParameter> {
        vec![EffectParameter::new(
            "angle",
            ParamValue::Range {
                value: 0.0,
                min: -360.0,
                max: 360.0,
            },
        )]
    }

    /// `angle` is in degrees, clockwise on screen.
    fn stage(&self, params: &ParamValues, complexity: ShaderComplexity) -> StageDesc {
        let degrees = param_f64(params, "angle", 0.0) as f32;
        let t = Transform2D::from_trs_about(Vec2::ZERO, Vec2::ZERO, degrees.to_radians(), Vec2::ONE);
        StageDesc::new(self.kind().id(), StageOp::Transform(t), complexity)
    }
}
