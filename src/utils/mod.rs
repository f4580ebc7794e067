use std::cmp::Ordering;

/// Normalize MAC address to lowercase with colons
/// e.g. LLDP chassis id "001c.7301.0203" -> "00:1c:73:01:02:03"
pub fn normalize_mac(mac: &str) -> String {
    // Remove any existing separators
    let clean: String = mac
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect();

    if clean.len() != 12 {
        return mac.to_lowercase();
    }

    clean
        .chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
        .to_lowercase()
}

/// Validate a hostname.
/// Allows alphanumeric, hyphens, dots, and underscores. No whitespace or shell metacharacters.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

/// Numeric value of the last character of a hostname ("leaf1a2" -> 2).
/// MLAG pairs are told apart by it.
pub fn trailing_digit(hostname: &str) -> Option<u32> {
    hostname.chars().last().and_then(|c| c.to_digit(10))
}

/// Trailing number of an interface name ("Ethernet14" -> 14, "Ethernet1/4" -> 4)
pub fn trailing_number(name: &str) -> Option<u32> {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    name[name.len() - digits..].parse().ok()
}

/// LLDP reports neighbor ports quoted on some platforms ("\"Ethernet1\"").
pub fn unquote(s: &str) -> String {
    s.replace('"', "")
}

/// Split an interface name into its type and numeric path:
/// "Ethernet49/1" -> ("ethernet", [49, 1])
fn interface_key(name: &str) -> (String, Vec<u64>) {
    let re = regex_lite::Regex::new(r"^([A-Za-z-]+)\s*([0-9/.]*)$").ok();
    match re.as_ref().and_then(|re| re.captures(name)) {
        Some(caps) => {
            let kind = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
            let path = caps
                .get(2)
                .map(|m| {
                    m.as_str()
                        .split(['/', '.'])
                        .filter_map(|p| p.parse::<u64>().ok())
                        .collect()
                })
                .unwrap_or_default();
            (kind, path)
        }
        None => (name.to_lowercase(), vec![]),
    }
}

/// Order interface names the way a switch lists them (Ethernet2 before Ethernet10).
pub fn compare_interfaces(a: &str, b: &str) -> Ordering {
    interface_key(a).cmp(&interface_key(b)).then_with(|| a.cmp(b))
}

pub fn sort_interfaces(names: &mut [String]) {
    names.sort_by(|a, b| compare_interfaces(a, b));
}
