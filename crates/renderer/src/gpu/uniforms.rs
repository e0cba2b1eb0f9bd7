use bytemuck::{Pod, Zeroable};

use crate::session::Uniform;

/// CPU mirror of the `FragtoyParams` block declared by the fragment header.
///
/// `iResolution` is a std140 `vec3`, so `iGlobalTime` packs into its fourth
/// slot and `iMouse` starts on the next 16-byte boundary.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FragtoyUniforms {
    pub i_resolution: [f32; 3],
    pub i_global_time: f32,
    pub i_mouse: [f32; 4],
}

unsafe impl Zeroable for FragtoyUniforms {}
unsafe impl Pod for FragtoyUniforms {}

impl FragtoyUniforms {
    /// Applies a pushed value; returns false for values that live outside the
    /// block (the channel unit).
    pub fn apply(&mut self, uniform: Uniform) -> bool {
        match uniform {
            Uniform::GlobalTime(seconds) => self.i_global_time = seconds,
            Uniform::Mouse(mouse) => self.i_mouse = mouse,
            Uniform::Resolution(resolution) => self.i_resolution = resolution,
            Uniform::Channel(_) => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn fragtoy_uniforms_follow_std140_layout() {
        let uniforms = FragtoyUniforms::zeroed();
        let base = &uniforms as *const _ as usize;

        assert_eq!(align_of::<FragtoyUniforms>(), 16);
        assert_eq!(size_of::<FragtoyUniforms>(), 32);
        assert_eq!((&uniforms.i_resolution as *const _ as usize) - base, 0);
        assert_eq!((&uniforms.i_global_time as *const _ as usize) - base, 12);
        assert_eq!((&uniforms.i_mouse as *const _ as usize) - base, 16);
    }

    #[test]
    fn apply_updates_only_the_named_field() {
        let mut uniforms = FragtoyUniforms::zeroed();

        assert!(uniforms.apply(Uniform::Resolution([800.0, 600.0, 0.0])));
        assert!(uniforms.apply(Uniform::GlobalTime(2.5)));
        assert!(uniforms.apply(Uniform::Mouse([1.0, 2.0, 3.0, 4.0])));
        assert!(!uniforms.apply(Uniform::Channel(0)));

        assert_eq!(
            bytemuck::cast::<FragtoyUniforms, [f32; 8]>(uniforms),
            [800.0, 600.0, 0.0, 2.5, 1.0, 2.0, 3.0, 4.0]
        );
    }
}
