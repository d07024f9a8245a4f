// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Paintbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Paintbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Paintbridge: a filesystem hand-off protocol between a mesh editor and a texturing
//! application.
//!
//! Both sides exchange artifacts through a shared bridge root without a server or locks.
//! [`store`] owns the on-disk records, [`sync`] decides and carries out hand-offs, and
//! [`config`] holds the timing knobs.

pub mod config;
pub mod paths;
pub mod store;
pub mod sync;
