use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// CSV export of the organizational code sheet (URL or local path)
    pub org_url: String,
    pub output_file: String,
    pub org_code_column: String,
    pub fetch_timeout_secs: u64,
    pub ldap: LdapConfig,
    pub groups: GroupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    pub url: String,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub search_base: String,
    pub member_attribute: String,
    pub org_code_attribute: String,
    pub connect_timeout_secs: u64,
}

/// Grouper stems used for the patron-group (privilege) membership filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub grouper_base: String,
    pub faculty: String,
    pub staff: String,
    pub student: String,
    pub dcc: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            org_url: "".to_string(),
            output_file: "org_code_numbers.csv".to_string(),
            org_code_column: "Organization Code".to_string(),
            fetch_timeout_secs: 30,
            ldap: LdapConfig::default(),
            groups: GroupConfig::default(),
        }
    }
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            url: "ldaps://ldap.example.edu:636".to_string(),
            bind_dn: None,
            bind_password: None,
            search_base: "ou=People,dc=example,dc=edu".to_string(),
            member_attribute: "uid".to_string(),
            org_code_attribute: "employeePrimaryDept".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            grouper_base: "arizona.edu:dept:LBRY:pgrps".to_string(),
            faculty: "ual-faculty".to_string(),
            staff: "ual-staff".to_string(),
            student: "ual-students".to_string(),
            dcc: "ual-dcc".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    /// `LDAP_PASSWORD` wins over the password stored in the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var("LDAP_PASSWORD") {
            if !password.is_empty() {
                self.ldap.bind_password = Some(password);
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.org_url.trim().is_empty() {
            anyhow::bail!("org_url is empty in configuration");
        }
        if self.ldap.url.trim().is_empty() {
            anyhow::bail!("ldap.url is empty in configuration");
        }
        if self.org_code_column.trim().is_empty() {
            anyhow::bail!("org_code_column is empty in configuration");
        }
        Ok(())
    }
}

impl GroupConfig {
    pub fn group_for(&self, classification: Classification) -> &str {
        match classification {
            Classification::Faculty => &self.faculty,
            Classification::Staff => &self.staff,
            Classification::Student => &self.student,
            Classification::Dcc => &self.dcc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Faculty,
    Staff,
    Student,
    Dcc,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Classification::Faculty,
        Classification::Staff,
        Classification::Student,
        Classification::Dcc,
    ];
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Classification::Faculty => "faculty",
            Classification::Staff => "staff",
            Classification::Student => "student",
            Classification::Dcc => "dcc",
        };
        f.write_str(name)
    }
}

/// Per-code tallies appended to the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrgCounts {
    pub total: usize,
    pub privileged_total: usize,
    pub privileged_faculty: usize,
    pub privileged_staff: usize,
    pub privileged_student: usize,
    pub privileged_dcc: usize,
}

impl OrgCounts {
    pub const COLUMNS: [&'static str; 6] = [
        "total",
        "pgrps-tot",
        "pgrps-faculty",
        "pgrps-staff",
        "pgrps-student",
        "pgrps-dcc",
    ];

    pub fn values(&self) -> [usize; 6] {
        [
            self.total,
            self.privileged_total,
            self.privileged_faculty,
            self.privileged_staff,
            self.privileged_student,
            self.privileged_dcc,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_survives_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.org_url = "https://example.edu/org_codes.csv".to_string();
        config.save_to_file(path).unwrap();

        let loaded = Config::load_from_file(path).unwrap();
        assert_eq!(loaded.org_url, config.org_url);
        assert_eq!(loaded.org_code_column, "Organization Code");
        assert_eq!(loaded.groups.student, "ual-students");
        assert!(loaded.ldap.bind_dn.is_none());
    }

    #[test]
    fn validate_rejects_missing_org_url() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("org_url"));
    }

    #[test]
    fn counts_follow_column_order() {
        let counts = OrgCounts {
            total: 9,
            privileged_total: 5,
            privileged_faculty: 1,
            privileged_staff: 2,
            privileged_student: 3,
            privileged_dcc: 4,
        };
        assert_eq!(counts.values(), [9, 5, 1, 2, 3, 4]);
        assert_eq!(OrgCounts::COLUMNS[1], "pgrps-tot");
    }
}
