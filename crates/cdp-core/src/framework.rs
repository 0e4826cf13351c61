/// Coolify build packs.
pub const BUILD_PACK_NIXPACKS: &str = "nixpacks";
pub const BUILD_PACK_STATIC: &str = "static";
pub const BUILD_PACK_DOCKERFILE: &str = "dockerfile";

/// Build settings for a detected (or user-edited) framework.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameworkInfo {
    pub name: String,
    pub build_pack: String,
    pub install_command: String,
    pub build_command: String,
    pub start_command: String,
    pub publish_directory: String,
    pub port: String,
}

impl FrameworkInfo {
    pub fn is_static(&self) -> bool {
        self.build_pack == BUILD_PACK_STATIC
    }
}
