//! Dump rendering for route snapshots.

use colored::*;

use rtable_core::types::RouteSnapshot;

/// Renders snapshots as a fixed-width table.
pub fn render_table(routes: &[RouteSnapshot]) -> String {
    if routes.is_empty() {
        return format!("{}", "(routing table is empty)".dimmed());
    }

    let header = format!(
        "{:<20} {:<4} {:<20} {:<12} {}",
        "Destination", "Mask", "Gateway", "Oif", "Expire"
    );
    let mut out = format!("{}\n", header.bold());
    for route in routes {
        out.push_str(&render_row(route));
        out.push('\n');
    }
    out
}

/// One table row, without colour so widths stay exact.
pub fn render_row(route: &RouteSnapshot) -> String {
    let gateway = route.gateway.map(|g| g.to_string()).unwrap_or_default();
    format!(
        "{:<20} {:<4} {:<20} {:<12} {}sec",
        route.destination.to_string(),
        route.mask_len,
        gateway,
        route.oif.as_deref().unwrap_or(""),
        remaining_secs(route.remaining_ms),
    )
}

/// Whole seconds left, rounded up so a live route never shows 0.
fn remaining_secs(remaining_ms: u64) -> u64 {
    remaining_ms.div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    use rtable_core::types::RouteEntry;
    use rtable_core::RouteKey;
    use std::time::Duration;

    fn snapshot(remaining_ms: u64, gateway: Option<Ipv4Addr>) -> RouteSnapshot {
        let key = RouteKey::parse("122.1.1.1", 32).unwrap();
        RouteEntry::new(key, gateway, Some("eth0".into()), Duration::from_secs(30))
            .unwrap()
            .snapshot(Some(Duration::from_millis(remaining_ms)))
    }

    #[test]
    fn test_row_layout() {
        let row = render_row(&snapshot(29_400, Some(Ipv4Addr::new(10, 1, 1, 1))));
        assert_eq!(
            row,
            format!("{:<20} {:<4} {:<20} {:<12} 30sec", "122.1.1.1", 32, "10.1.1.1", "eth0")
        );
    }

    #[test]
    fn test_row_without_gateway() {
        let row = render_row(&snapshot(1_000, None));
        assert!(row.starts_with("122.1.1.1"));
        assert!(row.ends_with(" 1sec"));
        assert!(!row.contains("10.1.1.1"));
    }

    #[test]
    fn test_table_lists_every_route() {
        let routes = vec![snapshot(5_000, None), snapshot(6_000, None)];
        let out = render_table(&routes);
        assert_eq!(out.lines().count(), 3);
        assert!(out.contains("Destination"));
    }

    #[test]
    fn test_empty_table() {
        assert!(render_table(&[]).contains("empty"));
    }
}
