// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity claims and silo profiles flowing through verification.

use url::Url;

/// Identity asserted by a completed personal-site login.
///
/// `rel_me_links` are the outbound `rel="me"` links found on the verified
/// site; the claimed silo username is derived from them per silo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthClaim {
    pub personal_site_url: String,
    pub rel_me_links: Vec<String>,
}

impl AuthClaim {
    pub fn new(personal_site_url: impl Into<String>, rel_me_links: Vec<String>) -> Self {
        Self {
            personal_site_url: personal_site_url.into(),
            rel_me_links,
        }
    }

    /// rel-me links whose host is `domain` or one of its subdomains, in page order.
    pub fn links_to_domain<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = Url> + 'a {
        self.rel_me_links
            .iter()
            .map(|link| link.trim())
            .filter(|link| !link.is_empty())
            .filter_map(|link| Url::parse(link).ok())
            .filter(move |url| {
                url.host_str()
                    .map(|host| domain_matches(host, domain))
                    .unwrap_or(false)
            })
    }
}

/// Normalized profile of a silo account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiloProfile {
    pub silo_user_id: String,
    pub username: String,
    pub display_name: String,
    pub image_url: Option<String>,
    /// Website and bio links, website first.
    pub bio_links: Vec<String>,
    pub is_public: bool,
}

/// A profile whose ownership has been proven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedProfile {
    pub profile: SiloProfile,
    pub username: String,
}

/// Whether `host` is `domain` itself or a subdomain of it. Case-insensitive.
pub fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Host of a link, lowercased and without a leading `www.`.
///
/// Bare hostnames without a scheme are accepted.
pub fn domain_from_link(link: &str) -> Option<String> {
    let link = link.trim();
    let parsed = Url::parse(link)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| Url::parse(&format!("http://{link}")).ok())?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
