use crate::models::{Classification, GroupConfig, LdapConfig};
use anyhow::{Context, Result};
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{ldap_escape, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

pub type MemberSet = HashSet<String>;

const PAGE_SIZE: i32 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberQuery {
    /// Everyone in one patron group.
    Role(Classification),
    /// Members of an organizational code. With `privileged == false` the
    /// patron-group filter is dropped and every member of the code counts.
    OrgCode { code: String, privileged: bool },
}

impl MemberQuery {
    pub fn all_members(code: &str) -> Self {
        MemberQuery::OrgCode {
            code: code.to_string(),
            privileged: false,
        }
    }

    pub fn privileged_members(code: &str) -> Self {
        MemberQuery::OrgCode {
            code: code.to_string(),
            privileged: true,
        }
    }
}

pub trait DirectoryService {
    async fn resolve_members(&mut self, query: &MemberQuery) -> Result<MemberSet>;
}

/// Renders member queries as LDAP filter strings.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    groups: GroupConfig,
    org_code_attribute: String,
}

impl QueryBuilder {
    pub fn new(groups: GroupConfig, org_code_attribute: &str) -> Self {
        Self {
            groups,
            org_code_attribute: org_code_attribute.to_string(),
        }
    }

    fn grouper_member(&self, classification: Classification) -> String {
        format!(
            "ismemberof={}:{}",
            self.groups.grouper_base,
            self.groups.group_for(classification)
        )
    }

    pub fn filter(&self, query: &MemberQuery) -> String {
        match query {
            MemberQuery::Role(classification) => {
                format!("({})", self.grouper_member(*classification))
            }
            MemberQuery::OrgCode { code, privileged } => {
                let org = format!("({}={})", self.org_code_attribute, ldap_escape(code.as_str()));
                if !*privileged {
                    return org;
                }
                let any_group: String = Classification::ALL
                    .iter()
                    .map(|c| format!("({})", self.grouper_member(*c)))
                    .collect();
                format!("(&{}(|{}))", org, any_group)
            }
        }
    }
}

pub struct LdapDirectory {
    ldap: Ldap,
    builder: QueryBuilder,
    search_base: String,
    member_attribute: String,
}

impl LdapDirectory {
    pub async fn connect(config: &LdapConfig, groups: &GroupConfig) -> Result<Self> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.connect_timeout_secs));
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.url)
            .await
            .with_context(|| format!("Failed to connect to directory: {}", config.url))?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection error: {}", e);
            }
        });

        if let Some(bind_dn) = &config.bind_dn {
            let password = config.bind_password.as_deref().unwrap_or("");
            ldap.simple_bind(bind_dn, password)
                .await?
                .success()
                .with_context(|| format!("Directory bind failed for {}", bind_dn))?;
        }

        Ok(Self {
            ldap,
            builder: QueryBuilder::new(groups.clone(), &config.org_code_attribute),
            search_base: config.search_base.clone(),
            member_attribute: config.member_attribute.clone(),
        })
    }

    /// Unbinds and drops the connection.
    pub async fn close(mut self) -> Result<()> {
        self.ldap.unbind().await?;
        Ok(())
    }
}

impl DirectoryService for LdapDirectory {
    async fn resolve_members(&mut self, query: &MemberQuery) -> Result<MemberSet> {
        let filter = self.builder.filter(query);
        debug!("ldap search: {}", filter);

        // Patron groups outgrow server size limits; page through them.
        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(PAGE_SIZE)),
        ];
        let mut search = self
            .ldap
            .streaming_search_with(
                adapters,
                &self.search_base,
                Scope::Subtree,
                &filter,
                vec![self.member_attribute.as_str()],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(entry) = search.next().await? {
            entries.push(SearchEntry::construct(entry));
        }
        search.finish().await.success()?;

        Ok(collect_members(entries, &self.member_attribute))
    }
}

/// Gathers every value of `attribute` across the entries. Attribute names
/// compare case-insensitively, as LDAP does.
fn collect_members<I>(entries: I, attribute: &str) -> MemberSet
where
    I: IntoIterator<Item = SearchEntry>,
{
    let mut members = MemberSet::new();
    for entry in entries {
        for (name, values) in entry.attrs {
            if name.eq_ignore_ascii_case(attribute) {
                members.extend(values);
            }
        }
    }
    members
}

#[cfg(test)]
pub mod fixture {
    use super::*;
    use std::collections::HashMap;

    /// In-memory directory keyed by query, records every query it serves.
    #[derive(Debug, Default)]
    pub struct FixtureDirectory {
        pub roles: HashMap<Classification, MemberSet>,
        pub all_members: HashMap<String, MemberSet>,
        pub privileged: HashMap<String, MemberSet>,
        pub fail_on: Option<MemberQuery>,
        pub served: Vec<MemberQuery>,
    }

    pub fn members(ids: &[&str]) -> MemberSet {
        ids.iter().map(|id| id.to_string()).collect()
    }

    impl DirectoryService for FixtureDirectory {
        async fn resolve_members(&mut self, query: &MemberQuery) -> Result<MemberSet> {
            if self.fail_on.as_ref() == Some(query) {
                anyhow::bail!("directory unavailable for {:?}", query);
            }
            self.served.push(query.clone());

            let found = match query {
                MemberQuery::Role(c) => self.roles.get(c),
                MemberQuery::OrgCode { code, privileged: false } => self.all_members.get(code),
                MemberQuery::OrgCode { code, privileged: true } => self.privileged.get(code),
            };
            Ok(found.cloned().unwrap_or_default())
        }
    }
}
