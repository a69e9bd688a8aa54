use glam::Vec3;
use orrery_types::BodyId;

use crate::scene::BodyTransform;

/// Bodies further than this from the player cannot be visited.
pub const SELECT_RANGE: f32 = 65.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SelectorSettings {
    pub select_range: f32,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            select_range: SELECT_RANGE,
        }
    }
}

/// The nearest candidate and how far away it is.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Selection {
    pub id: BodyId,
    pub distance: f32,
}

/// Nearest candidate to `player` by the translation of its world matrix.
///
/// Ties keep the first candidate encountered.
pub fn closest_object<'a>(candidates: impl IntoIterator<Item = &'a BodyTransform>, player: Vec3) -> Option<Selection> {
    let mut best: Option<Selection> = None;
    for candidate in candidates {
        let distance = candidate.position().distance(player);
        match best {
            Some(ref current) if current.distance <= distance => {}
            _ => {
                best = Some(Selection {
                    id: candidate.id,
                    distance,
                })
            }
        }
    }
    best
}

/// Tracks the visit target frame to frame.
#[derive(Debug, Clone)]
pub struct Selector {
    settings: SelectorSettings,
    selection: Option<Selection>,
    can_visit: bool,
}

impl Selector {
    pub fn new(settings: SelectorSettings) -> Self {
        Self {
            settings,
            selection: None,
            can_visit: false,
        }
    }

    /// Re-selects among the visitable bodies in `transforms`.
    ///
    /// While `visiting` the previous selection is kept untouched and visiting is not
    /// offered again.
    pub fn update(&mut self, transforms: &[BodyTransform], player: Vec3, visiting: bool) {
        if visiting {
            self.can_visit = false;
            return;
        }

        self.selection = closest_object(transforms.iter().filter(|t| t.id.is_visitable()), player);
        self.can_visit = self.evaluate(visiting);
    }

    /// Stores an externally chosen selection, then recomputes eligibility.
    pub fn set_selection(&mut self, selection: Option<Selection>, visiting: bool) {
        self.selection = selection;
        self.can_visit = self.evaluate(visiting);
    }

    fn evaluate(&self, visiting: bool) -> bool {
        !visiting
            && self
                .selection
                .map_or(false, |s| s.distance <= self.settings.select_range)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Whether the visit action would currently succeed. Also drives the outline.
    pub fn can_visit(&self) -> bool {
        self.can_visit
    }

    pub fn settings(&self) -> &SelectorSettings {
        &self.settings
    }
}
