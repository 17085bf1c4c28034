/*
 * Responsibility
 * - ドメインロジック (hints / claims registry / LTI モジュール / custom 置換 / auth)
 * - インフラ寄りのクライアント (cache)
 */
pub mod auth;
pub mod cache;
pub mod claims;
pub mod custom;
pub mod hints;
pub mod lti;
