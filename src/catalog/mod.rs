//! Modelo de malla (catálogo) inmutable.
//!
//! `Catalog::build` valida los registros crudos, arma el grafo de prerrequisitos
//! con petgraph y detecta ciclos de dependencias pelando nodos al estilo Kahn:
//! cualquier nodo que quede sin ordenar pertenece a un ciclo.
//!
//! Submódulos:
//! - `store`: lectura de mallas desde ficheros JSON (capa externa al núcleo)

pub mod store;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{RecommendError, RecommendResult};
use crate::models::{Course, RawCourse};

/// Límite de créditos cuando la malla no declara uno para el ciclo.
pub const DEFAULT_CREDIT_LIMIT: i32 = 21;

/// Datos crudos de una revisión de malla, ya parseados por el cargador.
#[derive(Debug, Clone, Default)]
pub struct RawCatalog {
    /// Año/revisión de la malla (p. ej. 2019); se usa para estimar su "antigüedad".
    pub revision: Option<u32>,
    pub courses: Vec<RawCourse>,
    pub credit_limits: BTreeMap<u32, i32>,
    pub default_credit_limit: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    courses: Vec<Course>,
    index: HashMap<String, usize>,
    // cuántos cursos listan a cada curso como prerrequisito
    dependents: Vec<usize>,
    topo: Vec<usize>,
    credit_limits: BTreeMap<u32, i32>,
    default_credit_limit: i32,
    revision: Option<u32>,
    edge_count: usize,
}

impl Catalog {
    pub fn build(raw: RawCatalog) -> RecommendResult<Catalog> {
        let mut courses: Vec<Course> = Vec::with_capacity(raw.courses.len());
        let mut index: HashMap<String, usize> = HashMap::new();

        for rc in raw.courses.into_iter() {
            let code = rc.code.trim().to_string();
            if code.is_empty() {
                return Err(RecommendError::malformed("curso con código vacío"));
            }
            if index.contains_key(&code) {
                return Err(RecommendError::malformed(format!("código duplicado: {}", code)));
            }
            if rc.cycle == 0 {
                return Err(RecommendError::malformed(format!("{}: el ciclo debe ser >= 1", code)));
            }
            if rc.credits == 0 {
                return Err(RecommendError::malformed(format!("{}: los créditos deben ser > 0", code)));
            }

            let mut seen: HashSet<String> = HashSet::new();
            let mut prerequisites: Vec<String> = Vec::new();
            for p in rc.prerequisites.iter() {
                let p = p.trim().to_string();
                if p.is_empty() || !seen.insert(p.clone()) {
                    continue;
                }
                if p == code {
                    return Err(RecommendError::malformed(format!("{} es prerrequisito de sí mismo", code)));
                }
                prerequisites.push(p);
            }

            index.insert(code.clone(), courses.len());
            courses.push(Course {
                code,
                title: rc.title,
                cycle: rc.cycle,
                credits: rc.credits,
                prerequisites,
            });
        }

        // Grafo prerrequisito -> curso
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..courses.len()).map(|i| graph.add_node(i)).collect();
        let mut edge_count = 0;
        for (i, course) in courses.iter().enumerate() {
            for p in course.prerequisites.iter() {
                let Some(&j) = index.get(p) else {
                    return Err(RecommendError::malformed(format!(
                        "{} referencia un prerrequisito desconocido: {}",
                        course.code, p
                    )));
                };
                graph.add_edge(nodes[j], nodes[i], ());
                edge_count += 1;
            }
        }

        let topo = kahn_order(&graph, &nodes);
        if topo.len() < courses.len() {
            let ordered: HashSet<usize> = topo.iter().copied().collect();
            let residual: Vec<&str> = (0..courses.len())
                .filter(|i| !ordered.contains(i))
                .map(|i| courses[i].code.as_str())
                .collect();
            return Err(RecommendError::malformed(format!(
                "ciclo de prerrequisitos entre: {}",
                residual.join(", ")
            )));
        }

        let dependents: Vec<usize> = nodes
            .iter()
            .map(|&n| graph.neighbors_directed(n, Direction::Outgoing).count())
            .collect();

        Ok(Catalog {
            courses,
            index,
            dependents,
            topo,
            credit_limits: raw.credit_limits,
            default_credit_limit: raw.default_credit_limit.unwrap_or(DEFAULT_CREDIT_LIMIT),
            revision: raw.revision,
            edge_count,
        })
    }

    /// Atajo para tests y llamadores que no traen revisión ni límite por defecto.
    pub fn from_courses(courses: Vec<RawCourse>, credit_limits: &[(u32, i32)]) -> RecommendResult<Catalog> {
        Catalog::build(RawCatalog {
            revision: None,
            courses,
            credit_limits: credit_limits.iter().copied().collect(),
            default_credit_limit: None,
        })
    }

    /// Cursos en orden de catálogo (el orden de la fuente).
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course(&self, code: &str) -> Option<&Course> {
        self.index.get(code).map(|&i| &self.courses[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Posición en orden de catálogo; es el desempate estable de todas las estrategias.
    pub fn position(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn courses_in_cycle(&self, cycle: u32) -> Vec<&Course> {
        self.courses.iter().filter(|c| c.cycle == cycle).collect()
    }

    pub fn credit_limit(&self, cycle: u32) -> i32 {
        self.credit_limits.get(&cycle).copied().unwrap_or(self.default_credit_limit)
    }

    pub fn max_cycle(&self) -> u32 {
        self.courses.iter().map(|c| c.cycle).max().unwrap_or(0)
    }

    pub fn dependents_count(&self, code: &str) -> usize {
        self.index.get(code).map(|&i| self.dependents[i]).unwrap_or(0)
    }

    pub fn prerequisite_edge_count(&self) -> usize {
        self.edge_count
    }

    /// Aristas de prerrequisito por curso (0.0 en una malla vacía).
    pub fn prerequisite_density(&self) -> f64 {
        if self.courses.is_empty() {
            return 0.0;
        }
        self.edge_count as f64 / self.courses.len() as f64
    }

    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// Orden topológico (prerrequisitos antes que dependientes), desempate por orden de catálogo.
    pub fn topological_order(&self) -> Vec<&Course> {
        self.topo.iter().map(|&i| &self.courses[i]).collect()
    }
}

// Kahn: siempre se libera primero el nodo listo con menor índice de catálogo.
fn kahn_order(graph: &DiGraph<usize, ()>, nodes: &[NodeIndex]) -> Vec<usize> {
    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|&n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order: Vec<usize> = Vec::with_capacity(nodes.len());

    while let Some(i) = ready.pop_first() {
        order.push(i);
        for next in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
            let j = graph[next];
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.insert(j);
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vec<RawCourse> {
        vec![
            RawCourse::new("A", "Cálculo I", 1, 4, &[]),
            RawCourse::new("B", "Álgebra", 1, 3, &[]),
            RawCourse::new("C", "Cálculo II", 2, 4, &["A", "B"]),
        ]
    }

    #[test]
    fn build_valid_catalog() {
        let cat = Catalog::from_courses(abc(), &[(1, 20), (2, 4)]).expect("malla válida");
        assert_eq!(cat.len(), 3);
        assert_eq!(cat.max_cycle(), 2);
        assert_eq!(cat.credit_limit(2), 4);
        assert_eq!(cat.credit_limit(7), DEFAULT_CREDIT_LIMIT);
        assert_eq!(cat.dependents_count("A"), 1);
        assert_eq!(cat.dependents_count("C"), 0);
        assert_eq!(cat.prerequisite_edge_count(), 2);
        let codes: Vec<&str> = cat.courses_in_cycle(1).iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B"]);
    }

    #[test]
    fn unknown_prerequisite_is_malformed() {
        let courses = vec![RawCourse::new("A", "x", 1, 3, &["Z"])];
        let err = Catalog::from_courses(courses, &[]).unwrap_err();
        assert!(matches!(err, RecommendError::MalformedCatalog { .. }));
    }

    #[test]
    fn self_loop_is_malformed() {
        let courses = vec![RawCourse::new("A", "x", 1, 3, &["A"])];
        assert!(Catalog::from_courses(courses, &[]).is_err());
    }

    #[test]
    fn dependency_cycle_is_malformed() {
        let courses = vec![
            RawCourse::new("A", "x", 1, 3, &["C"]),
            RawCourse::new("B", "y", 2, 3, &["A"]),
            RawCourse::new("C", "z", 3, 3, &["B"]),
            RawCourse::new("D", "w", 1, 3, &[]),
        ];
        match Catalog::from_courses(courses, &[]) {
            Err(RecommendError::MalformedCatalog { reason }) => {
                assert!(reason.contains("A") && reason.contains("B") && reason.contains("C"));
                assert!(!reason.contains("D"));
            }
            other => panic!("se esperaba MalformedCatalog, llegó {:?}", other),
        }
    }

    #[test]
    fn topological_order_respects_prerequisites() {
        let courses = vec![
            RawCourse::new("C", "x", 2, 3, &["B"]),
            RawCourse::new("A", "y", 1, 3, &[]),
            RawCourse::new("B", "z", 1, 3, &["A"]),
        ];
        let cat = Catalog::from_courses(courses, &[]).unwrap();
        let order: Vec<&str> = cat.topological_order().iter().map(|c| c.code.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn duplicate_prerequisites_are_collapsed() {
        let courses = vec![
            RawCourse::new("A", "x", 1, 3, &[]),
            RawCourse::new("B", "y", 2, 3, &["A", "A", " A "]),
        ];
        let cat = Catalog::from_courses(courses, &[]).unwrap();
        assert_eq!(cat.course("B").unwrap().prerequisites, vec!["A".to_string()]);
        assert_eq!(cat.dependents_count("A"), 1);
    }
}
