use std::path::{Path, PathBuf};

use cdp_core::FrameworkInfo;

/// Name of the generated Dockerfile; removed after the build.
pub const GENERATED_DOCKERFILE: &str = "Dockerfile.cdp";

const NGINX_IMAGE: &str = "nginx:alpine";
const NGINX_PORT: &str = "80";

/// Language toolchain the build stage runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toolchain {
    Node,
    Python,
    Go,
    Rust,
    Hugo,
    /// No build step at all (plain HTML).
    None,
}

impl Toolchain {
    fn of(framework: &FrameworkInfo) -> Self {
        match framework.name.as_str() {
            "Python" => Toolchain::Python,
            "Go" => Toolchain::Go,
            "Rust" => Toolchain::Rust,
            "Hugo" => Toolchain::Hugo,
            "Static Site" => Toolchain::None,
            _ if framework.install_command.is_empty()
                && framework.build_command.is_empty()
                && framework.is_static() =>
            {
                Toolchain::None
            }
            _ => Toolchain::Node,
        }
    }

    fn base_image(self) -> &'static str {
        match self {
            Toolchain::Node => "node:20-alpine",
            Toolchain::Python => "python:3.12-slim",
            Toolchain::Go => "golang:1.22-alpine",
            Toolchain::Rust => "rust:1-slim",
            Toolchain::Hugo => "hugomods/hugo:exts",
            Toolchain::None => NGINX_IMAGE,
        }
    }
}

/// Renders a Dockerfile for projects that do not ship their own.
///
/// Sites with a publish directory and no start command are built in a
/// first stage and served by nginx; everything else runs its start command.
pub struct DockerfileGenerator<'a> {
    framework: &'a FrameworkInfo,
    port: &'a str,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(framework: &'a FrameworkInfo, port: &'a str) -> Self {
        Self { framework, port }
    }

    fn serves_static(&self) -> bool {
        self.framework.is_static()
            || (!self.framework.publish_directory.is_empty()
                && self.framework.start_command.is_empty())
    }

    /// Port the container listens on.
    pub fn exposed_port(&self) -> &str {
        if self.serves_static() {
            NGINX_PORT
        } else {
            self.port
        }
    }

    pub fn render(&self) -> String {
        if self.serves_static() {
            self.render_static()
        } else {
            self.render_service()
        }
    }

    fn build_steps(&self) -> String {
        let mut steps = String::new();
        for command in [&self.framework.install_command, &self.framework.build_command] {
            if !command.is_empty() {
                steps.push_str(&format!("RUN {command}\n"));
            }
        }
        steps
    }

    fn render_static(&self) -> String {
        let toolchain = Toolchain::of(self.framework);
        let publish = match self.framework.publish_directory.as_str() {
            "" => ".",
            dir => dir,
        };

        if toolchain == Toolchain::None {
            return format!(
                r#"FROM {NGINX_IMAGE}
COPY {publish} /usr/share/nginx/html
EXPOSE {NGINX_PORT}
CMD ["nginx", "-g", "daemon off;"]
"#
            );
        }

        format!(
            r#"# === Stage 1: Build ===
FROM {base} AS builder
WORKDIR /app
COPY . .
{steps}
# === Stage 2: Serve ===
FROM {NGINX_IMAGE}
COPY --from=builder /app/{publish} /usr/share/nginx/html
EXPOSE {NGINX_PORT}
CMD ["nginx", "-g", "daemon off;"]
"#,
            base = toolchain.base_image(),
            steps = self.build_steps(),
        )
    }

    fn render_service(&self) -> String {
        let toolchain = Toolchain::of(self.framework);
        let start = match (self.framework.start_command.as_str(), toolchain) {
            ("", Toolchain::Python) => "python main.py",
            ("", Toolchain::Rust) => "cargo run --release",
            ("", _) => "npm start",
            (command, _) => command,
        };

        format!(
            r#"FROM {base}
WORKDIR /app
COPY . .
{steps}ENV PORT={port}
EXPOSE {port}
CMD ["sh", "-c", "{start}"]
"#,
            base = toolchain.base_image(),
            steps = self.build_steps(),
            port = self.port,
            start = start.replace('"', "\\\""),
        )
    }
}

/// The Dockerfile a build uses.
#[derive(Debug)]
pub enum BuildFile {
    /// The project's own `Dockerfile`.
    Project(PathBuf),
    Generated(TempDockerfile),
}

impl BuildFile {
    /// Use `dir/Dockerfile` when present, otherwise write a generated one.
    pub fn prepare(dir: &Path, generator: &DockerfileGenerator<'_>) -> Result<Self, DockerfileError> {
        let own = dir.join("Dockerfile");
        if own.is_file() {
            return Ok(BuildFile::Project(own));
        }
        TempDockerfile::write(dir, &generator.render()).map(BuildFile::Generated)
    }

    pub fn path(&self) -> &Path {
        match self {
            BuildFile::Project(path) => path,
            BuildFile::Generated(temp) => temp.path(),
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, BuildFile::Generated(_))
    }
}

/// A generated `Dockerfile.cdp`, deleted when dropped.
///
/// Dropping happens on every exit path, including `?` returns, panics
/// and cancelled futures.
#[derive(Debug)]
pub struct TempDockerfile {
    path: PathBuf,
}

impl TempDockerfile {
    pub fn write(dir: &Path, content: &str) -> Result<Self, DockerfileError> {
        let path = dir.join(GENERATED_DOCKERFILE);
        std::fs::write(&path, content).map_err(|e| DockerfileError::Write {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "wrote generated Dockerfile");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDockerfile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove generated Dockerfile");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DockerfileError {
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
