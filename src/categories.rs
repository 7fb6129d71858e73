//! Category Tree
//!
//! 카테고리 계층(최대 4단계) 탐색 도우미. 전체 카테고리를 한 번에 읽어 메모리에서 계산합니다.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::Category;

/// 허용되는 최대 깊이 (주 카테고리 = 1단계)
pub const MAX_CATEGORY_DEPTH: usize = 4;

/// 경로 구분자: "주 > 하위1 > 하위2"
pub const PATH_SEPARATOR: &str = " > ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryChoice {
    pub id: i64,
    pub path: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: HashMap<i64, Category>,
    children: HashMap<Option<i64>, Vec<i64>>,
}

impl CategoryTree {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut children: HashMap<Option<i64>, Vec<i64>> = HashMap::new();
        for c in &categories {
            children.entry(c.parent_id).or_default().push(c.id);
        }
        let nodes: HashMap<i64, Category> = categories.into_iter().map(|c| (c.id, c)).collect();
        for ids in children.values_mut() {
            ids.sort_by(|a, b| nodes[a].name.cmp(&nodes[b].name).then(a.cmp(b)));
        }
        Self { nodes, children }
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.nodes.contains_key(&id)
    }

    /// 이름순 자식 노드 (None = 주 카테고리)
    pub fn children(&self, parent_id: Option<i64>) -> Vec<&Category> {
        self.children
            .get(&parent_id)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// 루트부터 id 까지의 노드 목록. 손상된 데이터의 순환은 방문 집합으로 끊는다.
    fn ancestry(&self, id: i64) -> Vec<&Category> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(id);
        while let Some(cid) = cursor {
            if !seen.insert(cid) {
                break;
            }
            let Some(node) = self.nodes.get(&cid) else {
                break;
            };
            path.push(node);
            cursor = node.parent_id;
        }
        path.reverse();
        path
    }

    /// 1 = 주 카테고리
    pub fn depth(&self, id: i64) -> usize {
        self.ancestry(id).len()
    }

    /// 전체 경로 문자열: "Transport > Sea"
    pub fn path(&self, id: Option<i64>) -> String {
        let Some(id) = id else {
            return String::new();
        };
        self.ancestry(id)
            .iter()
            .map(|c| c.name.as_str())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }

    /// 자기 자신 + 모든 하위 노드 id (전위 순회)
    pub fn descendant_ids(&self, id: i64) -> Vec<i64> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        let mut seen = HashSet::new();
        while let Some(cid) = stack.pop() {
            if !seen.insert(cid) {
                continue;
            }
            out.push(cid);
            if let Some(kids) = self.children.get(&Some(cid)) {
                stack.extend(kids.iter().rev());
            }
        }
        out
    }

    /// 선택 목록용: 깊이 우선, 단계별 이름순, 전체 경로 포함
    pub fn choices(&self) -> Vec<CategoryChoice> {
        let mut out = Vec::new();
        self.collect_choices(None, "", 1, &mut out);
        out
    }

    fn collect_choices(&self, parent_id: Option<i64>, prefix: &str, depth: usize, out: &mut Vec<CategoryChoice>) {
        if depth > MAX_CATEGORY_DEPTH + 1 {
            return;
        }
        for node in self.children(parent_id) {
            let path = if prefix.is_empty() {
                node.name.clone()
            } else {
                format!("{}{}{}", prefix, PATH_SEPARATOR, node.name)
            };
            out.push(CategoryChoice { id: node.id, path: path.clone(), depth });
            self.collect_choices(Some(node.id), &path, depth + 1, out);
        }
    }
}
