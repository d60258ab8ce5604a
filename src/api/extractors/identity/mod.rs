/*!
 * Verified identity extractor
 *
 * Responsibility:
 * - middleware が検証済みの VerifiedIdentity を handler に提供する
 * - HTTP / axum 依存は core に閉じ込める
 */

mod core;

pub use core::IdentityExtractor;
