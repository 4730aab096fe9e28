/// Shader loading - compiled SPIR-V from disk into shader modules

use ash::vk;
use std::fs::File;
use std::path::{Path, PathBuf};
use triangle_engine::engine_error;
use triangle_engine::triangle::{Error, Result};

use crate::vulkan_error::{vk_err, SOURCE};

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// `<dir>/<name>.spv`
pub fn shader_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.spv", name))
}

fn asset_failed(message: String) -> Error {
    engine_error!(SOURCE, "{}", message);
    Error::AssetLoadFailed(message)
}

/// Read a SPIR-V binary as 32-bit words
pub fn load_spirv(path: &Path) -> Result<Vec<u32>> {
    let mut file = File::open(path)
        .map_err(|e| asset_failed(format!("Could not open shader file \"{}\": {}", path.display(), e)))?;
    let code = ash::util::read_spv(&mut file)
        .map_err(|e| asset_failed(format!("Could not read shader file \"{}\": {}", path.display(), e)))?;

    if code.first() != Some(&SPIRV_MAGIC) {
        return Err(asset_failed(format!("\"{}\" is not a SPIR-V module", path.display())));
    }
    Ok(code)
}

/// Shader module owning its Vulkan handle
pub struct ShaderModule {
    device: ash::Device,
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: vk::ShaderStageFlags,
}

impl ShaderModule {
    /// Load `<dir>/<name>.spv` (e.g. `triangle.vert`) for `stage`
    pub fn load(device: &ash::Device, dir: &Path, name: &str, stage: vk::ShaderStageFlags) -> Result<Self> {
        let code = load_spirv(&shader_path(dir, name))?;
        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { device.create_shader_module(&create_info, None) }
            .map_err(|e| vk_err("vkCreateShaderModule", e))?;

        Ok(Self {
            device: device.clone(),
            module,
            stage,
        })
    }

    /// Pipeline stage description using the `main` entry point
    pub fn stage_info(&self) -> vk::PipelineShaderStageCreateInfo<'static> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage)
            .module(self.module)
            .name(c"main")
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
