use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique image tag such as `production-3fa91c0e`.
pub fn generate(environment: &str) -> String {
    let nanos = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_nanos(),
        Err(before_epoch) => before_epoch.duration().as_nanos(),
    };
    let mut hasher = DefaultHasher::new();
    nanos.hash(&mut hasher);
    std::process::id().hash(&mut hasher);
    format!("{environment}-{:08x}", hasher.finish() as u32)
}

/// `registry/username/project`, tolerating a trailing slash on the registry.
pub fn image_name(registry: &str, username: &str, project: &str) -> String {
    format!("{}/{username}/{project}", registry.trim_end_matches('/'))
}
