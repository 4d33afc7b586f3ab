// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Criterion benchmarks for kmc-core live under `benches/`; this library
//! target only anchors the package.
#![forbid(unsafe_code)]
