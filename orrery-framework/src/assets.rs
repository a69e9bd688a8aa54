use std::{
    io,
    path::{Path, PathBuf},
};

use glam::UVec2;
use orrery::types::{CubeTexture, Texture, TextureFormat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Failure to load {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failure to decode {path}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Cube face {path} is {actual} but faces must be square and {expected} texels wide")]
    CubeFaceSize { path: String, expected: u32, actual: UVec2 },
}

/// Reads assets relative to a base directory.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    base: PathBuf,
}
impl AssetLoader {
    pub fn new_local(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn get_asset(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full_path = self.base.join(path);
        std::fs::read(&full_path).map_err(|source| AssetError::Io {
            path: full_path.display().to_string(),
            source,
        })
    }

    pub fn load_texture(&self, path: &str) -> Result<Texture, AssetError> {
        profiling::scope!("load texture", path);

        let bytes = self.get_asset(path)?;
        decode_texture(&bytes, path)
    }

    /// Loads a texture, substituting a single texel of `fallback` if it can't be read.
    pub fn load_texture_or_fallback(&self, path: &str, fallback: [u8; 4]) -> Texture {
        match self.load_texture(path) {
            Ok(texture) => texture,
            Err(e) => {
                log::warn!("{}, using fallback texture", error_chain(&e));
                Texture::fallback(fallback)
            }
        }
    }

    /// Loads six square faces of equal size in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn load_cube(&self, faces: [&str; 6]) -> Result<CubeTexture, AssetError> {
        profiling::scope!("load cube texture");

        let mut size = None;
        let mut data: [Vec<u8>; 6] = Default::default();
        for (face, path) in data.iter_mut().zip(faces) {
            let texture = self.load_texture(path)?;
            let expected = *size.get_or_insert(texture.size.x);
            if texture.size.x != texture.size.y || texture.size.x != expected {
                return Err(AssetError::CubeFaceSize {
                    path: path.to_owned(),
                    expected,
                    actual: texture.size,
                });
            }
            *face = texture.data;
        }

        Ok(CubeTexture {
            label: Some(String::from("skybox")),
            faces: data,
            format: TextureFormat::Rgba8UnormSrgb,
            size: size.unwrap_or(1),
        })
    }

    pub fn load_cube_or_fallback(&self, faces: [&str; 6], fallback: [u8; 4]) -> CubeTexture {
        match self.load_cube(faces) {
            Ok(cube) => cube,
            Err(e) => {
                log::warn!("{}, using fallback skybox", error_chain(&e));
                CubeTexture::solid(fallback)
            }
        }
    }
}

/// Decodes any image format `image` understands into sRGB RGBA8.
pub fn decode_texture(bytes: &[u8], label: &str) -> Result<Texture, AssetError> {
    let image = image::load_from_memory(bytes)
        .map_err(|source| AssetError::Decode {
            path: label.to_owned(),
            source,
        })?
        .into_rgba8();
    let size = UVec2::new(image.width(), image.height());

    Ok(Texture {
        label: Some(label.to_owned()),
        data: image.into_raw(),
        format: TextureFormat::Rgba8UnormSrgb,
        size,
    })
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageOutputFormat, Rgba, RgbaImage};

    use super::*;

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageOutputFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("orrery-assets-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn png_decodes_to_rgba8() {
        let texture = decode_texture(&png(2, 3, [10, 20, 30, 255]), "tiny.png").unwrap();
        assert_eq!(texture.size, UVec2::new(2, 3));
        assert_eq!(texture.data.len(), 2 * 3 * 4);
        assert_eq!(&texture.data[..4], &[10, 20, 30, 255]);
        assert_eq!(texture.label.as_deref(), Some("tiny.png"));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            decode_texture(b"not an image", "junk.png"),
            Err(AssetError::Decode { .. })
        ));
    }

    #[test]
    fn missing_file_falls_back() {
        let loader = AssetLoader::new_local(scratch_dir("missing"));
        assert!(matches!(loader.load_texture("nope.png"), Err(AssetError::Io { .. })));

        let texture = loader.load_texture_or_fallback("nope.png", [1, 2, 3, 4]);
        assert_eq!(texture.size, UVec2::ONE);
        assert_eq!(texture.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn cube_faces_must_match() {
        let dir = scratch_dir("cube");
        std::fs::write(dir.join("a.png"), png(4, 4, [0, 0, 0, 255])).unwrap();
        std::fs::write(dir.join("b.png"), png(2, 2, [0, 0, 0, 255])).unwrap();
        let loader = AssetLoader::new_local(&dir);

        let cube = loader.load_cube(["a.png"; 6]).unwrap();
        assert_eq!(cube.size, 4);
        assert!(cube.faces.iter().all(|face| face.len() == 4 * 4 * 4));

        let faces = ["a.png", "a.png", "b.png", "a.png", "a.png", "a.png"];
        match loader.load_cube(faces) {
            Err(AssetError::CubeFaceSize { expected, actual, .. }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, UVec2::splat(2));
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(loader.load_cube_or_fallback(faces, [9, 9, 9, 255]).size, 1);
    }
}
