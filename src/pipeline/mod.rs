//! Pipeline stages for document-to-Markdown jobs.
//!
//! Each submodule implements exactly one step, and the two external stages
//! sit behind traits so the orchestrator can run against fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ extract ──▶ locate ──▶ render
//! (path)    (office→PDF)  (engine)    (artifact) (md→html, optional)
//! ```
//!
//! 1. [`normalize`] (Stage A) converts office documents to PDF via a
//!    headless converter; PDFs pass through
//! 2. [`extract`] (Stage B) is one blocking run of the extraction engine
//! 3. [`locate`] computes and reads `<ws>/<name>/auto/<name>.md`
//! 4. [`render`] optionally turns Markdown into single-line HTML
//!
//! [`command`] is the shared process runner both external stages use.

pub mod command;
pub mod extract;
pub mod locate;
pub mod normalize;
pub mod render;
