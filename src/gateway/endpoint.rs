//! Proxy categories and the gateway hosts they map to

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DOMAIN: &str = "iitd.ernet.in";
const RESEARCH_HOST: &str = "xen03.iitd.ernet.in";
const PROXY_PORT: u16 = 3128;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CategoryError {
    #[error("Unknown proxy category: {0}")]
    Unknown(String),
}

/// User category, which decides the proxy host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyCategory {
    Btech,
    Dual,
    Diit,
    Faculty,
    Integrated,
    Mtech,
    Phd,
    RetFaculty,
    Staff,
    IrdStaff,
    Mba,
    Mdes,
    Msc,
    Msr,
    Pgdip,
    Research,
}

impl ProxyCategory {
    pub const ALL: [ProxyCategory; 16] = [
        ProxyCategory::Btech,
        ProxyCategory::Dual,
        ProxyCategory::Diit,
        ProxyCategory::Faculty,
        ProxyCategory::Integrated,
        ProxyCategory::Mtech,
        ProxyCategory::Phd,
        ProxyCategory::RetFaculty,
        ProxyCategory::Staff,
        ProxyCategory::IrdStaff,
        ProxyCategory::Mba,
        ProxyCategory::Mdes,
        ProxyCategory::Msc,
        ProxyCategory::Msr,
        ProxyCategory::Pgdip,
        ProxyCategory::Research,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ProxyCategory::Btech => "btech",
            ProxyCategory::Dual => "dual",
            ProxyCategory::Diit => "diit",
            ProxyCategory::Faculty => "faculty",
            ProxyCategory::Integrated => "integrated",
            ProxyCategory::Mtech => "mtech",
            ProxyCategory::Phd => "phd",
            ProxyCategory::RetFaculty => "retfaculty",
            ProxyCategory::Staff => "staff",
            ProxyCategory::IrdStaff => "irdstaff",
            ProxyCategory::Mba => "mba",
            ProxyCategory::Mdes => "mdes",
            ProxyCategory::Msc => "msc",
            ProxyCategory::Msr => "msr",
            ProxyCategory::Pgdip => "pgdip",
            ProxyCategory::Research => "research",
        }
    }

    /// Numeric suffix of the `proxyNN` host, `None` for research
    fn proxy_number(self) -> Option<u8> {
        match self {
            ProxyCategory::Btech => Some(22),
            ProxyCategory::Dual | ProxyCategory::Mtech => Some(62),
            ProxyCategory::Phd => Some(61),
            ProxyCategory::Faculty | ProxyCategory::RetFaculty => Some(82),
            ProxyCategory::Diit
            | ProxyCategory::Integrated
            | ProxyCategory::Staff
            | ProxyCategory::IrdStaff
            | ProxyCategory::Mba
            | ProxyCategory::Mdes
            | ProxyCategory::Msc
            | ProxyCategory::Msr
            | ProxyCategory::Pgdip => Some(21),
            ProxyCategory::Research => None,
        }
    }

    pub fn host(self) -> String {
        match self.proxy_number() {
            Some(n) => format!("proxy{}.{}", n, DOMAIN),
            None => RESEARCH_HOST.to_string(),
        }
    }
}

impl FromStr for ProxyCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProxyCategory::ALL
            .into_iter()
            .find(|c| c.tag() == s)
            .ok_or_else(|| CategoryError::Unknown(s.to_string()))
    }
}

impl fmt::Display for ProxyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Addresses derived from a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEndpoint {
    pub category: ProxyCategory,
    pub host: String,
    /// Login/refresh/logout form
    pub form_url: String,
    /// HTTP proxy on the same host
    pub proxy_url: String,
    /// Proxy auto-config script published for the category
    pub pac_url: String,
}

impl GatewayEndpoint {
    pub fn new(category: ProxyCategory) -> Self {
        let host = category.host();
        Self {
            category,
            form_url: format!("https://{}/cgi-bin/proxy.cgi", host),
            proxy_url: format!("http://{}:{}", host, PROXY_PORT),
            pac_url: format!("http://www.cc.{}/cgi-bin/proxy.{}", DOMAIN, category.tag()),
            host,
        }
    }
}
