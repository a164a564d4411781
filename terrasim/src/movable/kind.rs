use std::fmt;

/// Concrete kind of a movable object.
///
/// Kinds form a fixed specialization chain. Each kind lists every class tag it
/// answers to, most specific first; preset lookups bucket by these tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Particle,
    Sprite,
    RotatingBody,
    Attachable,
    Actor,
    Device,
}

impl ObjectKind {
    pub const ALL: [Self; 6] = [
        Self::Particle,
        Self::Sprite,
        Self::RotatingBody,
        Self::Attachable,
        Self::Actor,
        Self::Device,
    ];

    /// Class tags this kind answers to, most specific first.
    pub fn capability_tags(self) -> &'static [&'static str] {
        match self {
            Self::Particle => &["Particle", "MovableObject", "SceneObject"],
            Self::Sprite => &["Sprite", "MovableObject", "SceneObject"],
            Self::RotatingBody => &["RotatingBody", "Sprite", "MovableObject", "SceneObject"],
            Self::Attachable => &[
                "Attachable",
                "RotatingBody",
                "Sprite",
                "MovableObject",
                "SceneObject",
            ],
            Self::Actor => &[
                "Actor",
                "RotatingBody",
                "Sprite",
                "MovableObject",
                "SceneObject",
            ],
            Self::Device => &[
                "Device",
                "Attachable",
                "RotatingBody",
                "Sprite",
                "MovableObject",
                "SceneObject",
            ],
        }
    }

    pub fn class_name(self) -> &'static str {
        self.capability_tags()[0]
    }

    pub fn from_class_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.class_name() == name)
    }

    pub fn is_a(self, tag: &str) -> bool {
        self.capability_tags().contains(&tag)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}
