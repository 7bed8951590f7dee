// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use umbra_core::math::Extent2D;
use umbra_core::renderer::error::RenderError;

/// Device creation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WgpuContextOptions {
    /// Adapter preference.
    pub power_preference: wgpu::PowerPreference,
    /// Features the device must expose. Initialization fails without them.
    pub required_features: wgpu::Features,
    /// Present with vertical sync.
    pub vsync: bool,
}

impl Default for WgpuContextOptions {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            vsync: true,
        }
    }
}

/// Features enabled whenever the adapter offers them.
fn optional_features() -> wgpu::Features {
    wgpu::Features::DEPTH_CLIP_CONTROL | wgpu::Features::FLOAT32_FILTERABLE
}

/// Holds the core WGPU state objects required for rendering.
///
/// A context either presents to a window surface or renders headless, in
/// which case `surface` and `surface_config` are `None`.
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    /// Presentation surface.
    pub surface: Option<wgpu::Surface<'static>>,
    /// The selected adapter.
    pub adapter: wgpu::Adapter,
    /// Logical device.
    pub device: wgpu::Device,
    /// Command queue.
    pub queue: wgpu::Queue,

    /// Configuration for the surface's swapchain behavior.
    pub surface_config: Option<wgpu::SurfaceConfiguration>,

    // Store info for easy access
    /// Adapter name.
    pub adapter_name: String,
    /// Adapter backend.
    pub adapter_backend: wgpu::Backend,
    /// Adapter device type.
    pub adapter_device_type: wgpu::DeviceType,
    /// Features enabled on the device.
    pub active_device_features: wgpu::Features,
    /// Limits of the device.
    pub device_limits: wgpu::Limits,
}

impl WgpuGraphicsContext {
    /// Initializes a context without a presentation surface.
    pub async fn headless(options: WgpuContextOptions) -> Result<Self, RenderError> {
        log::info!("Initializing headless WGPU Graphics Context...");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
        Self::create(&instance, None, Extent2D::new(1, 1), options)
            .await
            .map_err(|e| RenderError::InitializationFailed(format!("{e:#}")))
    }

    /// Initializes a context presenting to `window`.
    ///
    /// ## Arguments
    /// * `window` - Anything that provides raw window and display handles.
    /// * `size` - The initial physical size of the window surface.
    /// * `options` - Adapter and device options.
    pub async fn with_window<W>(
        window: Arc<W>,
        size: Extent2D,
        options: WgpuContextOptions,
    ) -> Result<Self, RenderError>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        log::info!("Initializing WGPU Graphics Context for a window surface...");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::InitializationFailed(format!("Failed to create surface: {e}")))?;
        log::debug!("WGPU surface created for the window.");

        Self::create(&instance, Some(surface), size, options)
            .await
            .map_err(|e| RenderError::InitializationFailed(format!("{e:#}")))
    }

    async fn create(
        instance: &wgpu::Instance,
        surface: Option<wgpu::Surface<'static>>,
        size: Extent2D,
        options: WgpuContextOptions,
    ) -> anyhow::Result<Self> {
        // --- 1. Select an Adapter ---
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("Failed to find a suitable adapter: {e}"))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?}, Type: {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        // --- 2. Create Logical Device and Command Queue from Adapter ---
        if !adapter.features().contains(options.required_features) {
            return Err(anyhow!(
                "Adapter lacks required features: requested {:?}, available {:?}",
                options.required_features,
                adapter.features()
            ));
        }
        let features_to_enable =
            options.required_features | (adapter.features() & optional_features());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Umbra Logical Device"),
                required_features: features_to_enable,
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await
            .context("Failed to create logical device")?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        let active_device_features = device.features();
        let device_limits = device.limits();
        log::info!("Active device features: {active_device_features:?}");
        log::debug!("Device limits: {device_limits:?}");

        // --- 3. Configure Surface ---
        let surface_config = match &surface {
            Some(surface) => {
                let config = Self::surface_configuration(surface, &adapter, size, options.vsync)?;
                surface.configure(&device, &config);
                log::info!(
                    "Surface configured: {:?}, {}x{}, {:?}",
                    config.format,
                    config.width,
                    config.height,
                    config.present_mode
                );
                Some(config)
            }
            None => None,
        };

        Ok(WgpuGraphicsContext {
            surface,
            adapter,
            device,
            queue,
            surface_config,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            adapter_device_type: adapter_info.device_type,
            active_device_features,
            device_limits,
        })
    }

    fn surface_configuration(
        surface: &wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        size: Extent2D,
        vsync: bool,
    ) -> anyhow::Result<wgpu::SurfaceConfiguration> {
        let surface_caps = surface.get_capabilities(adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("Surface is incompatible with the adapter")?;

        let present_mode = if vsync {
            wgpu::PresentMode::Fifo
        } else {
            surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|m| *m == wgpu::PresentMode::Mailbox)
                .unwrap_or(wgpu::PresentMode::Fifo) // Fifo is guaranteed to be supported
        };

        Ok(wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        })
    }

    /// Reconfigures the underlying surface (swapchain) when the window is resized.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        let (Some(surface), Some(config)) = (&self.surface, &mut self.surface_config) else {
            return;
        };
        if new_width > 0 && new_height > 0 {
            log::info!(
                "WgpuGraphicsContext: Resizing surface configuration to {new_width}x{new_height}"
            );
            config.width = new_width;
            config.height = new_height;
            surface.configure(&self.device, config);
        } else {
            log::warn!(
                "WgpuGraphicsContext: Ignoring resize request to zero dimensions: {new_width}x{new_height}"
            );
        }
    }

    /// Acquires the next surface texture, reconfiguring once if the
    /// swapchain was lost or outdated.
    pub fn acquire_surface_texture(&mut self) -> Result<wgpu::SurfaceTexture, RenderError> {
        let Some(surface) = &self.surface else {
            return Err(RenderError::SurfaceAcquisitionFailed(
                "headless context has no surface".to_string(),
            ));
        };

        match surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture)
            | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => Ok(texture),
            e @ wgpu::CurrentSurfaceTexture::Lost | e @ wgpu::CurrentSurfaceTexture::Outdated => {
                log::warn!("WgpuGraphicsContext: Swapchain surface lost or outdated ({e:?}). Reconfiguring.");
                if let Some(config) = &self.surface_config {
                    surface.configure(&self.device, config);
                }
                match surface.get_current_texture() {
                    wgpu::CurrentSurfaceTexture::Success(texture)
                    | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => Ok(texture),
                    e => Err(RenderError::SurfaceAcquisitionFailed(format!(
                        "after reconfigure: {e:?}"
                    ))),
                }
            }
            e @ wgpu::CurrentSurfaceTexture::Timeout => {
                log::warn!("WgpuGraphicsContext: Swapchain Timeout acquiring frame. ({e:?})");
                Err(RenderError::SurfaceAcquisitionFailed(format!("Timeout: {e:?}")))
            }
            e => {
                log::error!("WgpuGraphicsContext: Unexpected SurfaceError: {e:?}");
                Err(RenderError::SurfaceAcquisitionFailed(format!(
                    "Unexpected SurfaceError: {e:?}"
                )))
            }
        }
    }

    /// The surface color format, `None` when headless.
    pub fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        self.surface_config.as_ref().map(|config| config.format)
    }

    /// The surface size, `None` when headless.
    pub fn size(&self) -> Option<Extent2D> {
        self.surface_config
            .as_ref()
            .map(|config| Extent2D::new(config.width, config.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_prefer_vsync_on_a_discrete_gpu() {
        let options = WgpuContextOptions::default();
        assert!(options.vsync);
        assert_eq!(
            options.power_preference,
            wgpu::PowerPreference::HighPerformance
        );
        assert!(options.required_features.is_empty());
    }

    #[test]
    fn optional_features_cover_depth_clamp_and_float_filtering() {
        let optional = optional_features();
        assert!(optional.contains(wgpu::Features::DEPTH_CLIP_CONTROL));
        assert!(optional.contains(wgpu::Features::FLOAT32_FILTERABLE));
    }
}
