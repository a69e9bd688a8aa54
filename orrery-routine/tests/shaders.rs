use naga::{
    front::wgsl,
    valid::{Capabilities, ValidationFlags, Validator},
    ShaderStage,
};
use orrery_routine::shaders::WGSL_SHADERS;

fn entry_points(source: &str) -> Vec<(String, ShaderStage)> {
    let module = wgsl::parse_str(source).unwrap();
    module
        .entry_points
        .iter()
        .map(|entry| (entry.name.clone(), entry.stage))
        .collect()
}

#[test]
fn every_shader_parses_and_validates() {
    let mut count = 0;
    for file in WGSL_SHADERS.files() {
        let name = file.path().display().to_string();
        let source = file.contents_utf8().unwrap();

        let module = match wgsl::parse_str(source) {
            Ok(module) => module,
            Err(e) => panic!("{name} failed to parse:\n{}", e.emit_to_string(source)),
        };

        let mut validator = Validator::new(ValidationFlags::all(), Capabilities::empty());
        if let Err(e) = validator.validate(&module) {
            panic!("{name} failed to validate: {e:?}");
        }
        count += 1;
    }
    assert_eq!(count, 5);
}

#[test]
fn model_shader_has_every_pass_entry() {
    let entries = entry_points(WGSL_SHADERS.get_file("model.wgsl").unwrap().contents_utf8().unwrap());
    for (name, stage) in [
        ("vs_main", ShaderStage::Vertex),
        ("vs_instanced", ShaderStage::Vertex),
        ("vs_outline", ShaderStage::Vertex),
        ("fs_main", ShaderStage::Fragment),
        ("fs_outline", ShaderStage::Fragment),
    ] {
        assert!(entries.contains(&(name.to_owned(), stage)), "missing {name}");
    }
}

#[test]
fn fullscreen_shaders_use_default_entries() {
    for name in ["skybox.wgsl", "particle.wgsl", "blur.wgsl", "composite.wgsl"] {
        let entries = entry_points(WGSL_SHADERS.get_file(name).unwrap().contents_utf8().unwrap());
        assert!(entries.contains(&("vs_main".to_owned(), ShaderStage::Vertex)), "{name}");
        assert!(entries.contains(&("fs_main".to_owned(), ShaderStage::Fragment)), "{name}");
    }
}
