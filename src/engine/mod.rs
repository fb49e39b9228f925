pub mod client;
pub mod normalize;
pub mod views;

pub use client::{ClientOptions, EngineClient, Tail};
pub use views::*;

use crate::utils::Result;

/// 仪表盘聚合所需的只读查询
pub trait EngineApi: Sync {
    fn list_containers(&self, all: bool) -> Result<Vec<ContainerView>>;
    fn list_images(&self) -> Result<Vec<ImageView>>;
    fn list_networks(&self) -> Result<Vec<NetworkView>>;
    fn list_volumes(&self) -> Result<Vec<VolumeView>>;
    fn host_info(&self) -> Result<HostInfo>;
}
