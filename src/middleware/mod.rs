/*
 * Responsibility
 * - middleware の公開インターフェース
 * - http: request id / trace / body limit / timeout
 * - security_headers: LTI 起動 (iframe 埋め込み) 前提のレスポンスヘッダ
 */
pub mod http;
pub mod security_headers;
