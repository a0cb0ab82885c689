//! Compile targets and concrete output variants.

use serde::{Deserialize, Serialize};

/// Which compiled variant(s) of a source are requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// The server variant only (data-loading code retained).
    Server,
    /// The client variant only (data-loading code stripped).
    Client,
    /// Both variants.
    Both,
}

impl Target {
    /// Expands the target into its concrete output variants.
    pub fn variants(self) -> &'static [Variant] {
        match self {
            Target::Server => &[Variant::Server],
            Target::Client => &[Variant::Client],
            Target::Both => &[Variant::Server, Variant::Client],
        }
    }
}

/// A single concrete output variant of a compiled source.
///
/// Unlike [`Target`], a variant is never "both"; it names exactly one
/// output directory under the build root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// Server-side output, written under `server/`.
    Server,
    /// Client-side output, written under `client/`.
    Client,
}

impl Variant {
    /// The output directory name for this variant.
    pub fn dir(self) -> &'static str {
        match self {
            Variant::Server => "server",
            Variant::Client => "client",
        }
    }

    /// Whether this is the client variant.
    pub fn is_client(self) -> bool {
        matches!(self, Variant::Client)
    }
}
