#![forbid(unsafe_code)]

//! `kelpie` is a headless mind map editing core.
//!
//! The store owns structure, the layout engine owns geometry, and the
//! [`Editor`] wires them together in the mandated order: mutation →
//! pre-mutation snapshot → layout recompute → best-effort persist.
//! Rendering, gesture decoding, and storage transport stay with the
//! embedder, which drives the [`Editor`] through [`Command`] values.

pub use kelpie_core::*;

mod editor;
pub use editor::{Command, DEFAULT_ROOT_TEXT, Editor};

pub mod layout {
    //! Layout + viewport surface re-exported from `kelpie-layout`.
    pub use kelpie_layout::viewport::{MAX_SCALE, MIN_SCALE};
    pub use kelpie_layout::{LayoutReport, NodeMetrics, Side, Viewport, geom, layout, side_of};
}
