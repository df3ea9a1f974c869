use anyhow::{anyhow, Result};

use super::lifecycle::module_challenges;
use super::target::parse_challenge_path;
use crate::api::{in_dojo, ChallengePath, Dojo, DojoApi, Module};
use crate::app::Config;
use crate::constants::DOJO_IDS;
use crate::utils::{absolutize_links, paint, print_markdown, show_table, TableData};

/// Canonical dojos first in curriculum order, then everything else by id
pub fn sort_dojos(mut dojos: Vec<Dojo>) -> Vec<Dojo> {
    dojos.sort_by(|a, b| {
        let rank = |dojo: &Dojo| DOJO_IDS.iter().position(|id| *id == dojo.id).unwrap_or(DOJO_IDS.len());
        rank(a).cmp(&rank(b)).then_with(|| a.id.cmp(&b.id))
    });
    dojos
}

/// Whether requests can carry credentials, which reveals private dojos
pub fn has_credentials(config: &Config) -> bool {
    in_dojo() || config.cookie_file().is_file()
}

pub fn dojos_table(dojos: &[Dojo]) -> TableData {
    let mut table = TableData::new("Dojos", &["id", "name", "official"]);
    for dojo in dojos {
        table.push(vec![
            dojo.id.clone(),
            dojo.name.clone(),
            if dojo.official { "✓" } else { "" }.to_string(),
        ]);
    }
    table
}

pub fn modules_table(dojo: &str, modules: &[Module]) -> TableData {
    let mut table = TableData::new(format!("Modules in {}", dojo), &["id", "name", "challenges"]);
    for module in modules {
        table.push(vec![
            module.id.clone(),
            module.name.clone(),
            module_challenges(module).len().to_string(),
        ]);
    }
    table
}

pub fn challenges_table(dojo: &str, module: &Module) -> TableData {
    let mut table = TableData::new(format!("Challenges in {}/{}", dojo, module.id), &["id", "name"]);
    for challenge in module_challenges(module) {
        table.push(vec![challenge.id.clone(), challenge.name.clone()]);
    }
    table
}

fn find_module<'a>(modules: &'a [Module], dojo: &str, module: &str) -> Result<&'a Module> {
    modules
        .iter()
        .find(|candidate| candidate.id == module)
        .ok_or_else(|| anyhow!("Module {}/{} does not exist.", dojo, module))
}

/// List dojos, the modules of a dojo, the challenges of a module, or describe a challenge
pub async fn list(
    config: &Config,
    api: &dyn DojoApi,
    dojo: Option<&str>,
    module: Option<&str>,
    challenge: Option<&str>,
    official: bool,
) -> Result<()> {
    let auth = has_credentials(config);

    let path = match (dojo, module, challenge) {
        (Some(dojo), Some(module), Some(challenge)) => Some(ChallengePath::new(dojo, module, challenge)),
        (_, _, Some(challenge)) => Some(parse_challenge_path(challenge, &api.docker_status().await?)?),
        _ => None,
    };
    if let Some(path) = path {
        return describe(config, api, &path, auth).await;
    }

    match (dojo, module) {
        (None, None) => {
            let dojos = sort_dojos(api.dojos(auth).await?);
            let dojos: Vec<Dojo> = dojos.into_iter().filter(|dojo| !official || dojo.official).collect();
            show_table(&dojos_table(&dojos));
        }
        (Some(dojo), None) => {
            let modules = api.modules(dojo, auth).await?;
            show_table(&modules_table(dojo, &modules));
        }
        (Some(dojo), Some(module)) => {
            let modules = api.modules(dojo, auth).await?;
            show_table(&challenges_table(dojo, find_module(&modules, dojo, module)?));
        }
        (None, Some(_)) => anyhow::bail!("Please specify the dojo of the module."),
    }
    Ok(())
}

async fn describe(config: &Config, api: &dyn DojoApi, path: &ChallengePath, auth: bool) -> Result<()> {
    let modules = api.modules(&path.dojo, auth).await?;
    let module = find_module(&modules, &path.dojo, &path.module)?;
    let challenge = module_challenges(module)
        .into_iter()
        .find(|challenge| challenge.id == path.challenge)
        .ok_or_else(|| anyhow!("Challenge {} does not exist.", path))?;

    println!("{}", paint("bold", format!("{} ({})", challenge.name, path)));
    println!();
    let description = challenge.description.as_deref().unwrap_or("No description.");
    print_markdown(&absolutize_links(description, &config.base_url));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Challenge, MockDojoApi};
    use pretty_assertions::assert_eq;

    fn dojo(id: &str, official: bool) -> Dojo {
        Dojo {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            official,
        }
    }

    #[test]
    fn test_sort_dojos() {
        let dojos = vec![
            dojo("zeta", false),
            dojo("program-security", true),
            dojo("alpha", false),
            dojo("welcome", true),
            dojo("linux-luminarium", true),
        ];
        let ids: Vec<String> = sort_dojos(dojos).into_iter().map(|dojo| dojo.id).collect();
        assert_eq!(
            ids,
            vec!["welcome", "linux-luminarium", "program-security", "alpha", "zeta"]
        );
    }

    #[test]
    fn test_challenges_table() {
        let module = Module {
            id: "hello".to_string(),
            name: "Hello Hackers".to_string(),
            description: None,
            challenges: vec![Challenge {
                id: "hello".to_string(),
                name: "Hello Hackers".to_string(),
                description: None,
            }],
            unified_items: Vec::new(),
        };
        let rendered = challenges_table("linux-luminarium", &module).render();
        assert!(rendered.contains("Challenges in linux-luminarium/hello"));
        assert!(rendered.contains("Hello Hackers"));
        assert!(modules_table("linux-luminarium", &[module]).render().contains("1"));
    }

    #[tokio::test]
    async fn test_list_module_without_dojo() {
        let api = MockDojoApi::new();
        let err = list(&Config::default(), &api, None, Some("hello"), None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dojo"));
    }

    #[tokio::test]
    async fn test_list_unknown_module() {
        let mut api = MockDojoApi::new();
        api.expect_modules().returning(|_, _| Ok(Vec::new()));
        let err = list(&Config::default(), &api, Some("welcome"), Some("nope"), None, false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Module welcome/nope does not exist.");
    }
}
