// src/holdings/roles.rs

use serde::Serialize;
use std::fmt;
use tracing::trace;

/// The four semantic columns a holdings table is read through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Code,
    Name,
    Weight,
    Shares,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Code, Role::Name, Role::Weight, Role::Shares];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Code => "code",
            Role::Name => "name",
            Role::Weight => "weight",
            Role::Shares => "shares",
        }
    }

    /// Known header spellings for this role, highest priority first.
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Role::Code => CODE_HEADERS,
            Role::Name => NAME_HEADERS,
            Role::Weight => WEIGHT_HEADERS,
            Role::Shares => SHARES_HEADERS,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static CODE_HEADERS: &[&str] = &["股票代號", "證券代號", "代號", "代碼", "Ticker", "Symbol"];
static NAME_HEADERS: &[&str] = &["股票名稱", "證券名稱", "名稱", "Name", "Security"];
static WEIGHT_HEADERS: &[&str] = &["比重(%)", "比重", "權重(%)", "權重", "Weight", "持股權重"];
static SHARES_HEADERS: &[&str] = &["股數", "持有股數", "持股股數", "Shares", "Units", "數量"];

/// Which column of a particular table plays each role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnRoles {
    pub code: Option<String>,
    pub name: Option<String>,
    pub weight: Option<String>,
    pub shares: Option<String>,
}

impl ColumnRoles {
    pub fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::Code => self.code.as_deref(),
            Role::Name => self.name.as_deref(),
            Role::Weight => self.weight.as_deref(),
            Role::Shares => self.shares.as_deref(),
        }
    }
}

/// Resolve one role: exact header first, then case-insensitive containment.
///
/// The containment pass walks columns in table order and, for each, tries the
/// candidates in priority order; `(%)` is stripped from candidates first.
pub fn pick_column(columns: &[String], candidates: &[&str]) -> Option<String> {
    if let Some(c) = candidates
        .iter()
        .find(|cand| columns.iter().any(|col| col.as_str() == **cand))
    {
        return Some(c.to_string());
    }

    let needles: Vec<String> = candidates
        .iter()
        .map(|k| k.to_lowercase().replace("(%)", ""))
        .collect();
    columns
        .iter()
        .find(|col| {
            let hay = col.to_lowercase();
            needles.iter().any(|n| hay.contains(n.as_str()))
        })
        .cloned()
}

/// Map a table's headers onto the code/name/weight/shares roles.
pub fn detect_columns(columns: &[String]) -> ColumnRoles {
    let roles = ColumnRoles {
        code: pick_column(columns, Role::Code.headers()),
        name: pick_column(columns, Role::Name.headers()),
        weight: pick_column(columns, Role::Weight.headers()),
        shares: pick_column(columns, Role::Shares.headers()),
    };
    for role in Role::ALL {
        trace!(%role, column = ?roles.get(role), "resolved column role");
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_localized_headers() {
        let roles = detect_columns(&cols(&["股票代號", "股票名稱", "股數", "持股權重"]));
        assert_eq!(roles.code.as_deref(), Some("股票代號"));
        assert_eq!(roles.name.as_deref(), Some("股票名稱"));
        assert_eq!(roles.weight.as_deref(), Some("持股權重"));
        assert_eq!(roles.shares.as_deref(), Some("股數"));
    }

    #[test]
    fn test_english_headers() {
        let roles = detect_columns(&cols(&["Ticker", "Name", "Weight", "Shares"]));
        assert_eq!(roles.get(Role::Code), Some("Ticker"));
        assert_eq!(roles.get(Role::Name), Some("Name"));
        assert_eq!(roles.get(Role::Weight), Some("Weight"));
        assert_eq!(roles.get(Role::Shares), Some("Shares"));
    }

    #[test]
    fn test_exact_match_follows_priority() {
        // both "代號" and "股票代號" are present; the higher-priority spelling wins
        let roles = detect_columns(&cols(&["代號", "股票代號"]));
        assert_eq!(roles.code.as_deref(), Some("股票代號"));
    }

    #[test]
    fn test_fuzzy_match_is_case_insensitive() {
        let roles = detect_columns(&cols(&[
            "SECURITY TICKER",
            "security name",
            "Portfolio Weight %",
            "Number of Shares",
        ]));
        assert_eq!(roles.code.as_deref(), Some("SECURITY TICKER"));
        // "security" is itself a name header and the ticker column sorts first
        assert_eq!(roles.name.as_deref(), Some("SECURITY TICKER"));
        assert_eq!(roles.weight.as_deref(), Some("Portfolio Weight %"));
        assert_eq!(roles.shares.as_deref(), Some("Number of Shares"));
    }

    #[test]
    fn test_percent_suffix_stripped_for_fuzzy() {
        let roles = detect_columns(&cols(&["代號", "權重（%）", "比重 %"]));
        // no exact hit; the full-width column comes first and contains "權重"
        assert_eq!(roles.weight.as_deref(), Some("權重（%）"));

        let roles = detect_columns(&cols(&["代號", "比重 (%)"]));
        assert_eq!(roles.weight.as_deref(), Some("比重 (%)"));
    }

    #[test]
    fn test_missing_roles_are_absent() {
        let roles = detect_columns(&cols(&["日期", "淨值"]));
        assert_eq!(roles, ColumnRoles::default());
    }

    #[test]
    fn test_deterministic() {
        let c = cols(&["證券代號", "證券名稱", "權重(%)", "持有股數"]);
        assert_eq!(detect_columns(&c), detect_columns(&c));
        assert_eq!(detect_columns(&c).weight.as_deref(), Some("權重(%)"));
        assert_eq!(detect_columns(&c).shares.as_deref(), Some("持有股數"));
    }
}
