//! Maps awaiting injection, and the seam to the image-to-palette converter.

use imagemap_storage::{
    Edition, MapDimension, MapId, MapOrigin, MapRecord, WorldError, WorldResult,
};

/// How a pending map gets its ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapIdChoice {
    /// Allocated at commit time from the world's free IDs.
    Auto,
    /// Chosen by the caller; may collide with an existing map.
    Fixed(MapId),
}

/// A decoded source image, row-major RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Converts an image into an edition's native map color buffer.
///
/// Implementations are pure: the same image and edition always yield the
/// same bytes.
pub trait PaletteCodec {
    fn encode(&self, image: &MapImage, edition: Edition) -> Vec<u8>;
}

/// A map that exists only in memory until a commit writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMap {
    pub id: MapIdChoice,
    pub colors: Vec<u8>,
    pub scale: u8,
    pub dimension: MapDimension,
    pub origin: MapOrigin,
    pub locked: bool,
}

impl PendingMap {
    /// A locked overworld map with an auto-assigned ID.
    pub fn new(colors: Vec<u8>) -> Self {
        Self {
            id: MapIdChoice::Auto,
            colors,
            scale: 0,
            dimension: MapDimension::Overworld,
            origin: MapOrigin::default(),
            locked: true,
        }
    }

    /// Run `image` through `codec` for `edition`.
    ///
    /// Fails with `InvalidRecord` if the codec output does not have the size
    /// the edition stores.
    pub fn from_image(
        codec: &dyn PaletteCodec,
        image: &MapImage,
        edition: Edition,
    ) -> WorldResult<Self> {
        let colors = codec.encode(image, edition);
        if colors.len() != edition.color_buffer_len() {
            return Err(WorldError::InvalidRecord(format!(
                "{}x{} image encoded to {} bytes, {} maps need {}",
                image.width,
                image.height,
                colors.len(),
                edition,
                edition.color_buffer_len()
            )));
        }
        Ok(Self::new(colors))
    }

    pub fn with_id(mut self, id: MapId) -> Self {
        self.id = MapIdChoice::Fixed(id);
        self
    }

    pub fn with_auto_id(mut self) -> Self {
        self.id = MapIdChoice::Auto;
        self
    }

    pub fn fixed_id(&self) -> Option<MapId> {
        match self.id {
            MapIdChoice::Fixed(id) => Some(id),
            MapIdChoice::Auto => None,
        }
    }

    pub(crate) fn to_record(&self, id: MapId) -> MapRecord {
        MapRecord {
            id,
            colors: self.colors.clone(),
            scale: self.scale,
            dimension: self.dimension,
            origin: self.origin,
            locked: self.locked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nearest-gray stand-in: one byte per pixel on Java, RGBA on Bedrock.
    struct GrayCodec;

    impl PaletteCodec for GrayCodec {
        fn encode(&self, image: &MapImage, edition: Edition) -> Vec<u8> {
            let gray: Vec<u8> = image.rgba.chunks(4).map(|px| px[0]).collect();
            match edition {
                Edition::Java => gray,
                Edition::Bedrock => gray.iter().flat_map(|g| [*g, *g, *g, 255]).collect(),
            }
        }
    }

    fn image(side: u32) -> MapImage {
        MapImage {
            width: side,
            height: side,
            rgba: vec![90; (side * side * 4) as usize],
        }
    }

    #[test]
    fn codec_output_becomes_pending_map() {
        let pending = PendingMap::from_image(&GrayCodec, &image(128), Edition::Bedrock).unwrap();
        assert_eq!(pending.colors.len(), Edition::Bedrock.color_buffer_len());
        assert_eq!(pending.id, MapIdChoice::Auto);

        let pending = pending.with_id(MapId(4));
        assert_eq!(pending.fixed_id(), Some(MapId(4)));
        assert_eq!(pending.to_record(MapId(4)).colors[..4], [90, 90, 90, 255]);
        assert_eq!(pending.with_auto_id().fixed_id(), None);
    }

    #[test]
    fn wrong_sized_codec_output_is_rejected() {
        assert!(matches!(
            PendingMap::from_image(&GrayCodec, &image(64), Edition::Java),
            Err(WorldError::InvalidRecord(_))
        ));
    }
}
