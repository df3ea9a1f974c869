use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::api::{ChallengePath, Challenge, Dojo, DojoApi, Module, Resource, ResourceKind, UnifiedItem};
use crate::challenge::{module_challenges, sort_dojos};
use crate::constants::{MODULE_FETCH_CONCURRENCY, SLIDES_URL, YOUTUBE_WATCH_URL};

pub const ROOT_LABEL: &str = "up/down: move, space: toggle, enter: select, ctrl+q: quit";

/// What a node stands for; start leaves carry the challenge they launch
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Dojo,
    Module,
    Header,
    Lecture,
    Resource,
    Challenge,
    Start { path: ChallengePath, practice: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub label: String,
    pub description: Option<String>,
    pub kind: NodeKind,
    pub expanded: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
            kind,
            expanded: false,
            children: Vec::new(),
        }
    }

    fn described(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|text| !text.trim().is_empty());
        self
    }

    /// Index paths of every node on screen, depth first
    pub fn visible(&self) -> Vec<Vec<usize>> {
        let mut rows = vec![Vec::new()];
        self.collect_visible(&mut Vec::new(), &mut rows);
        rows
    }

    fn collect_visible(&self, prefix: &mut Vec<usize>, rows: &mut Vec<Vec<usize>>) {
        if !self.expanded {
            return;
        }
        for (index, child) in self.children.iter().enumerate() {
            prefix.push(index);
            rows.push(prefix.clone());
            child.collect_visible(prefix, rows);
            prefix.pop();
        }
    }

    pub fn get(&self, path: &[usize]) -> Option<&TreeNode> {
        path.iter().try_fold(self, |node, &index| node.children.get(index))
    }

    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut TreeNode> {
        path.iter().try_fold(self, |node, &index| node.children.get_mut(index))
    }
}

/// Narrow the tree to one dojo, module or challenge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeFilter {
    pub dojo: Option<String>,
    pub module: Option<String>,
    pub challenge: Option<String>,
    pub official: bool,
}

impl TreeFilter {
    fn allows(wanted: &Option<String>, id: &str) -> bool {
        wanted.as_deref().map_or(true, |wanted| wanted == id)
    }

    fn narrows_below_dojo(&self) -> bool {
        self.dojo.is_some() || self.module.is_some() || self.challenge.is_some()
    }

    fn narrows_below_module(&self) -> bool {
        self.module.is_some() || self.challenge.is_some()
    }
}

/// Lecture text followed by its video and slides links
pub fn lecture_description(resource: &Resource) -> String {
    let mut parts = Vec::new();
    if let Some(content) = resource.content.as_deref().filter(|text| !text.trim().is_empty()) {
        parts.push(content.to_string());
    }
    if let Some(video) = &resource.video {
        let mut url = format!("{}{}", YOUTUBE_WATCH_URL, video);
        if let Some(playlist) = &resource.playlist {
            url.push_str(&format!("&list={}", playlist));
        }
        parts.push(format!("Video: {}", url));
    }
    if let Some(slides) = &resource.slides {
        parts.push(format!("Slides: {}{}/embed", SLIDES_URL, slides));
    }
    parts.join("\n\n")
}

fn challenge_node(dojo: &str, module: &str, challenge: &Challenge, expanded: bool) -> TreeNode {
    let path = ChallengePath::new(dojo, module, &challenge.id);
    let mut node = TreeNode::new(NodeKind::Challenge, format!("Challenge: {}", challenge.name))
        .described(challenge.description.clone());
    node.expanded = expanded;
    node.children = vec![
        TreeNode::new(
            NodeKind::Start {
                path: path.clone(),
                practice: false,
            },
            "Start Challenge",
        ),
        TreeNode::new(NodeKind::Start { path, practice: true }, "Start Challenge in Privileged Mode"),
    ];
    node
}

fn resource_node(resource: &Resource) -> TreeNode {
    let name = resource.name.clone().unwrap_or_default();
    match resource.kind {
        // headers carry their text in `content`
        ResourceKind::Header => {
            let label = resource.content.clone().filter(|text| !text.is_empty()).unwrap_or(name);
            TreeNode::new(NodeKind::Header, label)
        }
        ResourceKind::Lecture => TreeNode::new(NodeKind::Lecture, format!("Lecture: {}", name))
            .described(Some(lecture_description(resource))),
        ResourceKind::Markdown | ResourceKind::Other => {
            let label = if name.is_empty() { "Resource".to_string() } else { format!("Resource: {}", name) };
            TreeNode::new(NodeKind::Resource, label).described(resource.content.clone())
        }
    }
}

fn module_children(dojo: &str, module: &Module, filter: &TreeFilter) -> Vec<TreeNode> {
    let expand_challenge = filter.challenge.is_some();
    let wanted = |challenge: &Challenge| TreeFilter::allows(&filter.challenge, &challenge.id);

    if module.unified_items.is_empty() {
        return module_challenges(module)
            .into_iter()
            .filter(|challenge| wanted(*challenge))
            .map(|challenge| challenge_node(dojo, &module.id, challenge, expand_challenge))
            .collect();
    }

    // Resources stay next to whichever challenges pass the filter
    let matched = module.unified_items.iter().any(|item| match item {
        UnifiedItem::Challenge(challenge) => wanted(challenge),
        _ => false,
    });
    if !matched {
        return Vec::new();
    }
    module
        .unified_items
        .iter()
        .filter_map(|item| match item {
            UnifiedItem::Challenge(challenge) if wanted(challenge) => {
                Some(challenge_node(dojo, &module.id, challenge, expand_challenge))
            }
            UnifiedItem::Challenge(_) | UnifiedItem::Unknown => None,
            UnifiedItem::Resource(resource) => Some(resource_node(resource)),
        })
        .collect()
}

/// Assemble the browser tree from dojos and their modules
pub fn build_tree(dojos: Vec<(Dojo, Vec<Module>)>, filter: &TreeFilter) -> TreeNode {
    let mut root = TreeNode::new(NodeKind::Root, ROOT_LABEL);
    root.expanded = true;

    for (dojo, modules) in dojos {
        if (filter.official && !dojo.official) || !TreeFilter::allows(&filter.dojo, &dojo.id) {
            continue;
        }
        let module_nodes: Vec<TreeNode> = modules
            .iter()
            .filter(|module| TreeFilter::allows(&filter.module, &module.id))
            .filter_map(|module| {
                let children = module_children(&dojo.id, module, filter);
                if filter.challenge.is_some() && children.is_empty() {
                    return None;
                }
                let mut node = TreeNode::new(NodeKind::Module, format!("Module: {}", module.name))
                    .described(module.description.clone());
                node.expanded = filter.narrows_below_module();
                node.children = children;
                Some(node)
            })
            .collect();
        if filter.narrows_below_module() && module_nodes.is_empty() {
            continue;
        }

        let mut node = TreeNode::new(NodeKind::Dojo, format!("Dojo: {}", dojo.name)).described(dojo.description);
        node.expanded = filter.narrows_below_dojo();
        node.children = module_nodes;
        root.children.push(node);
    }
    root
}

/// Fetch what the filter needs and build the tree
pub async fn load_tree(api: &dyn DojoApi, filter: &TreeFilter, auth: bool) -> Result<TreeNode> {
    let dojos: Vec<Dojo> = sort_dojos(api.dojos(auth).await?)
        .into_iter()
        .filter(|dojo| (!filter.official || dojo.official) && TreeFilter::allows(&filter.dojo, &dojo.id))
        .collect();
    if let Some(dojo) = &filter.dojo {
        if dojos.is_empty() {
            anyhow::bail!("Dojo {} does not exist.", dojo);
        }
    }

    tracing::debug!("Fetching modules of {} dojos", dojos.len());
    let modules: Vec<Vec<Module>> = stream::iter(dojos.iter())
        .map(|dojo| async move {
            api.modules(&dojo.id, auth)
                .await
                .with_context(|| format!("Failed to fetch modules of dojo {}", dojo.id))
        })
        .buffered(MODULE_FETCH_CONCURRENCY)
        .try_collect()
        .await?;
    Ok(build_tree(dojos.into_iter().zip(modules).collect(), filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockDojoApi;
    use pretty_assertions::assert_eq;

    fn challenge(id: &str) -> Challenge {
        Challenge {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: Some(format!("About {}", id)),
        }
    }

    fn dojo(id: &str, official: bool) -> Dojo {
        Dojo {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            official,
        }
    }

    fn module(id: &str, items: Vec<UnifiedItem>, challenges: Vec<Challenge>) -> Module {
        Module {
            id: id.to_string(),
            name: id.to_string(),
            description: Some("Module text".to_string()),
            challenges,
            unified_items: items,
        }
    }

    fn lecture() -> Resource {
        Resource {
            kind: ResourceKind::Lecture,
            name: Some("Intro".to_string()),
            content: None,
            video: Some("abc".to_string()),
            playlist: Some("PL1".to_string()),
            slides: Some("xyz".to_string()),
        }
    }

    fn sample() -> Vec<(Dojo, Vec<Module>)> {
        let header: UnifiedItem =
            serde_json::from_str(r#"{"item_type":"resource","type":"header","id":"h1","content":"Basics"}"#)
                .unwrap();
        let items = vec![
            header,
            UnifiedItem::Resource(lecture()),
            UnifiedItem::Challenge(challenge("hello")),
            UnifiedItem::Challenge(challenge("world")),
        ];
        vec![
            (
                dojo("welcome", true),
                vec![module("intro", items, vec![challenge("hello"), challenge("world")])],
            ),
            (dojo("fun", false), vec![module("misc", vec![], vec![challenge("puzzle")])]),
        ]
    }

    #[test]
    fn test_lecture_description() {
        assert_eq!(
            lecture_description(&lecture()),
            "Video: https://www.youtube.com/watch?v=abc&list=PL1\n\n\
             Slides: https://docs.google.com/presentation/d/xyz/embed"
        );
    }

    #[test]
    fn test_full_tree_is_collapsed() {
        let root = build_tree(sample(), &TreeFilter::default());
        assert_eq!(root.label, ROOT_LABEL);
        let labels: Vec<&str> = root.children.iter().map(|node| node.label.as_str()).collect();
        assert_eq!(labels, vec!["Dojo: welcome", "Dojo: fun"]);
        assert_eq!(root.visible().len(), 3);

        let module = root.get(&[0, 0]).unwrap();
        let labels: Vec<&str> = module.children.iter().map(|node| node.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Basics", "Lecture: Intro", "Challenge: HELLO", "Challenge: WORLD"]
        );

        // Modules without unified items fall back to their challenge list
        assert_eq!(root.get(&[1, 0, 0]).unwrap().label, "Challenge: PUZZLE");
    }

    #[test]
    fn test_start_leaves() {
        let root = build_tree(sample(), &TreeFilter::default());
        let hello = root.get(&[0, 0, 2]).unwrap();
        assert_eq!(hello.description.as_deref(), Some("About hello"));
        assert_eq!(
            hello.children[1].kind,
            NodeKind::Start {
                path: ChallengePath::new("welcome", "intro", "hello"),
                practice: true,
            }
        );
        assert_eq!(hello.children[0].label, "Start Challenge");
    }

    #[test]
    fn test_filters_narrow_and_expand() {
        let filter = TreeFilter {
            challenge: Some("world".to_string()),
            ..TreeFilter::default()
        };
        let root = build_tree(sample(), &filter);
        assert_eq!(root.children.len(), 1);
        let rows = root.visible();
        let labels: Vec<&str> = rows.iter().map(|row| root.get(row).unwrap().label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                ROOT_LABEL,
                "Dojo: welcome",
                "Module: intro",
                "Basics",
                "Lecture: Intro",
                "Challenge: WORLD",
                "Start Challenge",
                "Start Challenge in Privileged Mode",
            ]
        );

        // modules without a matching challenge disappear, resources and all
        let puzzle = TreeFilter {
            challenge: Some("puzzle".to_string()),
            ..TreeFilter::default()
        };
        let root = build_tree(sample(), &puzzle);
        let labels: Vec<&str> = root.children.iter().map(|node| node.label.as_str()).collect();
        assert_eq!(labels, vec!["Dojo: fun"]);

        let official = TreeFilter {
            official: true,
            ..TreeFilter::default()
        };
        assert_eq!(build_tree(sample(), &official).children.len(), 1);
    }

    #[tokio::test]
    async fn test_load_tree_unknown_dojo() {
        let mut api = MockDojoApi::new();
        api.expect_dojos().returning(|_| Ok(vec![dojo("welcome", true)]));

        let filter = TreeFilter {
            dojo: Some("nope".to_string()),
            ..TreeFilter::default()
        };
        let err = load_tree(&api, &filter, false).await.unwrap_err();
        assert_eq!(err.to_string(), "Dojo nope does not exist.");
    }

    #[tokio::test]
    async fn test_load_tree_fetches_modules() {
        let mut api = MockDojoApi::new();
        api.expect_dojos().returning(|_| Ok(vec![dojo("fun", false)]));
        api.expect_modules()
            .withf(|dojo, _| dojo.to_string() == "fun")
            .returning(|_, _| Ok(vec![module("misc", vec![], vec![challenge("puzzle")])]));

        let root = load_tree(&api, &TreeFilter::default(), false).await.unwrap();
        assert_eq!(root.get(&[0, 0, 0]).unwrap().label, "Challenge: PUZZLE");
    }

    #[tokio::test]
    async fn test_load_tree_keeps_dojo_order() {
        let mut api = MockDojoApi::new();
        api.expect_dojos()
            .returning(|_| Ok(vec![dojo("welcome", true), dojo("fun", false)]));
        api.expect_modules()
            .times(2)
            .returning(|dojo, _| Ok(vec![module(&format!("{}-mod", dojo), vec![], vec![challenge("c")])]));

        let root = load_tree(&api, &TreeFilter::default(), false).await.unwrap();
        let modules: Vec<&str> = root
            .children
            .iter()
            .map(|dojo| dojo.children[0].label.as_str())
            .collect();
        assert_eq!(modules, vec!["Module: welcome-mod", "Module: fun-mod"]);
    }

    #[tokio::test]
    async fn test_load_tree_names_failing_dojo() {
        let mut api = MockDojoApi::new();
        api.expect_dojos().returning(|_| Ok(vec![dojo("fun", false)]));
        api.expect_modules()
            .returning(|_, _| Err(anyhow::anyhow!("connection reset")));

        let err = load_tree(&api, &TreeFilter::default(), false).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch modules of dojo fun");
    }
}
