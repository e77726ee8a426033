use maxminddb::{Reader, geoip2};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const CACHE_TTL: Duration = Duration::from_secs(86400);

#[derive(Debug, Clone)]
pub struct GeoData {
    /// ISO country code, e.g. "US".
    pub region: String,
    pub isp: Option<String>,
}

#[derive(Deserialize)]
struct IpApiResponse {
    #[serde(rename = "countryCode")]
    country_code: String,
    isp: Option<String>,
}

/// Best-effort region/ISP enrichment used at node creation. Lookup failure
/// is never an error for the caller; the fields just stay empty.
#[derive(Clone)]
pub struct GeoService {
    reader: Option<Arc<Reader<Vec<u8>>>>,
    cache: Arc<Mutex<HashMap<String, (GeoData, Instant)>>>,
}

impl GeoService {
    pub fn new(db_path: Option<&str>) -> Self {
        let reader = if let Some(path) = db_path {
            match Reader::open_readfile(path) {
                Ok(r) => Some(Arc::new(r)),
                Err(e) => {
                    tracing::warn!("Failed to open GeoIP DB at {}: {}", path, e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            reader,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn lookup(&self, ip: &str) -> Option<GeoData> {
        // 1. Cache
        {
            let mut cache = self.cache.lock().unwrap();
            if let Some((data, ts)) = cache.get(ip) {
                if ts.elapsed() < CACHE_TTL {
                    return Some(data.clone());
                }
                cache.remove(ip);
            }
        }

        // 2. Local MaxMind database
        if let Some(reader) = &self.reader {
            if let Ok(ip_addr) = ip.parse::<std::net::IpAddr>() {
                if let Ok(city) = reader.lookup::<geoip2::City>(ip_addr) {
                    if let Some(code) = city.country.and_then(|c| c.iso_code) {
                        let data = GeoData {
                            region: code.to_string(),
                            isp: None,
                        };
                        self.cache_put(ip, data.clone());
                        return Some(data);
                    }
                }
            }
        }

        // 3. Fallback API, skipped for loopback
        if ip == "127.0.0.1" || ip == "::1" {
            return None;
        }

        let url = format!("http://ip-api.com/json/{}?fields=countryCode,isp", ip);
        match reqwest::get(&url).await {
            Ok(resp) => {
                if let Ok(json) = resp.json::<IpApiResponse>().await {
                    let data = GeoData {
                        region: json.country_code,
                        isp: json.isp,
                    };
                    self.cache_put(ip, data.clone());
                    return Some(data);
                }
            }
            Err(e) => tracing::warn!("GeoIP API failed for {}: {}", ip, e),
        }

        None
    }

    fn cache_put(&self, ip: &str, data: GeoData) {
        let mut cache = self.cache.lock().unwrap();
        cache.insert(ip.to_string(), (data, Instant::now()));
    }
}
