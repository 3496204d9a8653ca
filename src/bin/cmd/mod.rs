// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

pub mod convert;
pub mod filter;
pub mod info;
pub mod merge;
pub mod recover;
pub mod sort;
pub mod structure;

pub use convert::ConvertCmd;
pub use filter::FilterCmd;
pub use info::InfoCmd;
pub use merge::MergeCmd;
pub use recover::RecoverCmd;
pub use sort::SortCmd;
pub use structure::{InspectCmd, StructureCmd};
