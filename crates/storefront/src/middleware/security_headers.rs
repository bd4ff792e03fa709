//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. The policy is locked
//! down except for what the Razorpay checkout widget needs.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::csp::CspNonce;

/// Origins the Razorpay checkout script loads from and talks to.
const RAZORPAY_SCRIPT: &str = "https://checkout.razorpay.com";
const RAZORPAY_FRAMES: &str = "https://api.razorpay.com https://checkout.razorpay.com";
const RAZORPAY_CONNECT: &str = "https://api.razorpay.com https://lumberjack.razorpay.com";

/// Build the Content-Security-Policy value for a request.
///
/// ```text
/// default-src 'none';
/// script-src 'self' 'nonce-{nonce}' https://checkout.razorpay.com;
/// style-src 'self';
/// font-src 'self';
/// img-src 'self' https: data:;
/// connect-src 'self' https://api.razorpay.com https://lumberjack.razorpay.com;
/// frame-src https://api.razorpay.com https://checkout.razorpay.com;
/// object-src 'none';
/// base-uri 'self';
/// form-action 'self';
/// frame-ancestors 'none'
/// ```
///
/// Images are allowed from any HTTPS origin because catalog images live in
/// object storage under a configurable public URL.
#[must_use]
pub fn content_security_policy(nonce: Option<&str>) -> String {
    let script_nonce = nonce
        .filter(|n| !n.is_empty())
        .map(|n| format!(" 'nonce-{n}'"))
        .unwrap_or_default();

    format!(
        "default-src 'none'; \
         script-src 'self'{script_nonce} {RAZORPAY_SCRIPT}; \
         style-src 'self'; \
         font-src 'self'; \
         img-src 'self' https: data:; \
         connect-src 'self' {RAZORPAY_CONNECT}; \
         frame-src {RAZORPAY_FRAMES}; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: strict-origin-when-cross-origin` - Razorpay checks the origin
/// - `Content-Security-Policy` - See [`content_security_policy`]
/// - `Permissions-Policy` - Deny sensitive features, allow payment for Razorpay
/// - `Cross-Origin-Opener-Policy: same-origin-allow-popups` - Razorpay opens popups for UPI/netbanking
/// - `X-DNS-Prefetch-Control: off` - Prevent DNS prefetch leakage
///
/// Must run inside `csp_nonce_middleware` so the nonce is in the request
/// extensions.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let nonce = request.extensions().get::<CspNonce>().cloned();
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    let csp = content_security_policy(nonce.as_ref().map(CspNonce::value));
    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(self \"https://api.razorpay.com\" \"https://checkout.razorpay.com\"), \
             usb=()",
        ),
    );

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );

    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_includes_nonce_and_razorpay() {
        let csp = content_security_policy(Some("abc123=="));
        assert!(csp.contains("script-src 'self' 'nonce-abc123==' https://checkout.razorpay.com;"));
        assert!(csp.contains("frame-src https://api.razorpay.com"));
        assert!(csp.contains("frame-ancestors 'none'"));
    }

    #[test]
    fn test_csp_without_nonce() {
        let csp = content_security_policy(None);
        assert!(csp.contains("script-src 'self' https://checkout.razorpay.com;"));
        assert!(!csp.contains("nonce-"));
    }
}
