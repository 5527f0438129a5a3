use crate::layers::LayerGradients;

/// Gradient clipping methods
#[derive(Clone, Debug, PartialEq)]
pub enum GradientClipper {
    /// Clip gradients by global norm (across all parameters)
    ClipByGlobalNorm { max_norm: f32 },

    /// No clipping
    None,
}

impl GradientClipper {
    pub fn from_bound(bound: Option<f32>) -> Self {
        match bound {
            Some(max_norm) => GradientClipper::ClipByGlobalNorm { max_norm },
            None => GradientClipper::None,
        }
    }

    /// Compute global norm of all gradients
    pub fn compute_global_norm(gradients: &[LayerGradients]) -> f32 {
        gradients.iter().map(LayerGradients::squared_norm).sum::<f32>().sqrt()
    }

    /// Clip in place and return the norm measured before clipping.
    pub fn clip(&self, gradients: &mut [LayerGradients]) -> f32 {
        let global_norm = Self::compute_global_norm(gradients);

        if let GradientClipper::ClipByGlobalNorm { max_norm } = self {
            if global_norm > *max_norm {
                let scale = max_norm / global_norm;
                for grad in gradients.iter_mut() {
                    grad.scale(scale);
                }
            }
        }

        global_norm
    }
}
