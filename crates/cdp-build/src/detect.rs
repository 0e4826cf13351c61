use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cdp_core::framework::{BUILD_PACK_DOCKERFILE, BUILD_PACK_NIXPACKS, BUILD_PACK_STATIC};
use cdp_core::FrameworkInfo;
use serde::Deserialize;

/// Project markers, checked in order. The first match wins.
const RULES: &[Rule] = &[
    Rule {
        markers: &["Dockerfile"],
        detect: dockerfile,
    },
    Rule {
        markers: &["package.json"],
        detect: node,
    },
    Rule {
        markers: &["hugo.toml", "config.toml"],
        detect: hugo,
    },
    Rule {
        markers: &["go.mod"],
        detect: go,
    },
    Rule {
        markers: &["requirements.txt", "pyproject.toml"],
        detect: python,
    },
    Rule {
        markers: &["Cargo.toml"],
        detect: rust,
    },
    Rule {
        markers: &["index.html"],
        detect: static_site,
    },
];

/// Node presets keyed by dependency name, checked in order.
const NODE_PRESETS: &[NodePreset] = &[
    NodePreset {
        dependency: "next",
        name: "Next.js",
        start_command: "npm start",
        publish_directory: "",
        port: "3000",
    },
    NodePreset {
        dependency: "astro",
        name: "Astro",
        start_command: "",
        publish_directory: "dist",
        port: "4321",
    },
    NodePreset {
        dependency: "nuxt",
        name: "Nuxt",
        start_command: "npm start",
        publish_directory: "",
        port: "3000",
    },
    NodePreset {
        dependency: "@sveltejs/kit",
        name: "SvelteKit",
        start_command: "npm run preview",
        publish_directory: "",
        port: "4173",
    },
    NodePreset {
        dependency: "vite",
        name: "Vite",
        start_command: "",
        publish_directory: "dist",
        port: "5173",
    },
    NodePreset {
        dependency: "react-scripts",
        name: "Create React App",
        start_command: "",
        publish_directory: "build",
        port: "",
    },
];

type DetectFn = fn(&Path) -> Result<Option<FrameworkInfo>, DetectError>;

struct Rule {
    markers: &'static [&'static str],
    /// `Ok(None)` lets the next rule try.
    detect: DetectFn,
}

struct NodePreset {
    dependency: &'static str,
    name: &'static str,
    start_command: &'static str,
    publish_directory: &'static str,
    port: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: HashMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: HashMap<String, String>,
    #[serde(default)]
    scripts: HashMap<String, String>,
}

/// Detect the framework of the project in `dir`.
///
/// Falls back to a generic nixpacks build when nothing matches.
pub fn detect(dir: &Path) -> Result<FrameworkInfo, DetectError> {
    for rule in RULES {
        if !rule.markers.iter().any(|m| dir.join(m).is_file()) {
            continue;
        }
        if let Some(info) = (rule.detect)(dir)? {
            tracing::debug!(framework = %info.name, build_pack = %info.build_pack, "detected framework");
            return Ok(info);
        }
    }

    Ok(FrameworkInfo {
        name: "Unknown".to_owned(),
        build_pack: BUILD_PACK_NIXPACKS.to_owned(),
        ..Default::default()
    })
}

fn dockerfile(_dir: &Path) -> Result<Option<FrameworkInfo>, DetectError> {
    Ok(Some(FrameworkInfo {
        name: "Dockerfile".to_owned(),
        build_pack: BUILD_PACK_DOCKERFILE.to_owned(),
        port: "3000".to_owned(),
        ..Default::default()
    }))
}

fn node(dir: &Path) -> Result<Option<FrameworkInfo>, DetectError> {
    let path = dir.join("package.json");
    let content = std::fs::read_to_string(&path).map_err(|e| DetectError::Read {
        path: path.clone(),
        source: e,
    })?;
    let pkg: PackageJson =
        serde_json::from_str(&content).map_err(|e| DetectError::PackageJson { path, source: e })?;

    let has_dep =
        |name: &str| pkg.dependencies.contains_key(name) || pkg.dev_dependencies.contains_key(name);

    if let Some(preset) = NODE_PRESETS.iter().find(|p| has_dep(p.dependency)) {
        return Ok(Some(FrameworkInfo {
            name: preset.name.to_owned(),
            build_pack: BUILD_PACK_NIXPACKS.to_owned(),
            install_command: "npm install".to_owned(),
            build_command: "npm run build".to_owned(),
            start_command: preset.start_command.to_owned(),
            publish_directory: preset.publish_directory.to_owned(),
            port: preset.port.to_owned(),
        }));
    }

    let script = |name: &str, command: &str| {
        if pkg.scripts.contains_key(name) {
            command.to_owned()
        } else {
            String::new()
        }
    };

    Ok(Some(FrameworkInfo {
        name: "Node.js".to_owned(),
        build_pack: BUILD_PACK_NIXPACKS.to_owned(),
        install_command: "npm install".to_owned(),
        build_command: script("build", "npm run build"),
        start_command: script("start", "npm start"),
        publish_directory: String::new(),
        port: "3000".to_owned(),
    }))
}

fn hugo(dir: &Path) -> Result<Option<FrameworkInfo>, DetectError> {
    // config.toml alone is too common to mean Hugo.
    let looks_like_hugo = ["content", "themes", "layouts"]
        .iter()
        .any(|d| dir.join(d).is_dir());
    if !looks_like_hugo {
        return Ok(None);
    }

    Ok(Some(FrameworkInfo {
        name: "Hugo".to_owned(),
        build_pack: BUILD_PACK_NIXPACKS.to_owned(),
        build_command: "hugo".to_owned(),
        publish_directory: "public".to_owned(),
        ..Default::default()
    }))
}

fn go(_dir: &Path) -> Result<Option<FrameworkInfo>, DetectError> {
    Ok(Some(FrameworkInfo {
        name: "Go".to_owned(),
        build_pack: BUILD_PACK_NIXPACKS.to_owned(),
        build_command: "go build -o app".to_owned(),
        start_command: "./app".to_owned(),
        port: "8080".to_owned(),
        ..Default::default()
    }))
}

fn python(dir: &Path) -> Result<Option<FrameworkInfo>, DetectError> {
    let install_command = if dir.join("pyproject.toml").is_file() {
        "pip install ."
    } else {
        "pip install -r requirements.txt"
    };

    Ok(Some(FrameworkInfo {
        name: "Python".to_owned(),
        build_pack: BUILD_PACK_NIXPACKS.to_owned(),
        install_command: install_command.to_owned(),
        port: "8000".to_owned(),
        ..Default::default()
    }))
}

fn rust(_dir: &Path) -> Result<Option<FrameworkInfo>, DetectError> {
    Ok(Some(FrameworkInfo {
        name: "Rust".to_owned(),
        build_pack: BUILD_PACK_NIXPACKS.to_owned(),
        build_command: "cargo build --release".to_owned(),
        port: "8080".to_owned(),
        ..Default::default()
    }))
}

fn static_site(_dir: &Path) -> Result<Option<FrameworkInfo>, DetectError> {
    Ok(Some(FrameworkInfo {
        name: "Static Site".to_owned(),
        build_pack: BUILD_PACK_STATIC.to_owned(),
        publish_directory: ".".to_owned(),
        port: "80".to_owned(),
        ..Default::default()
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    PackageJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}
