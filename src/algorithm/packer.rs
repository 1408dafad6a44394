// Empaquetado por backtracking con memo: dada una lista ordenada de candidatos
// con créditos, elige el subconjunto de MAYOR CANTIDAD de cursos que cabe en el
// presupuesto (y en el tope de cupos). Ante empate en cantidad gana la rama que
// incluye al candidato más temprano, así el orden de entrada decide el desempate.

use std::collections::HashMap;

struct Packer<'a> {
    credits: &'a [u32],
    // (índice, presupuesto restante, cupos restantes) -> máximo de cursos alcanzable
    memo: HashMap<(usize, u32, usize), usize>,
}

impl<'a> Packer<'a> {
    fn best(&mut self, i: usize, budget: u32, slots: usize) -> usize {
        if i >= self.credits.len() || slots == 0 {
            return 0;
        }
        if let Some(&v) = self.memo.get(&(i, budget, slots)) {
            return v;
        }
        let skip = self.best(i + 1, budget, slots);
        let w = self.credits[i];
        let take = if w <= budget {
            1 + self.best(i + 1, budget - w, slots - 1)
        } else {
            0
        };
        let v = take.max(skip);
        self.memo.insert((i, budget, slots), v);
        v
    }
}

/// Devuelve los índices elegidos, en el orden de entrada.
pub fn pack(credits: &[u32], budget: u32, max_items: Option<usize>) -> Vec<usize> {
    let n = credits.len();
    let mut slots = max_items.unwrap_or(n).min(n);
    let mut packer = Packer { credits, memo: HashMap::new() };

    let mut chosen: Vec<usize> = Vec::new();
    let mut remaining = budget;
    for i in 0..n {
        if slots == 0 {
            break;
        }
        let w = credits[i];
        if w > remaining {
            continue;
        }
        // incluir i sólo si no empeora la cantidad máxima alcanzable
        let here = packer.best(i, remaining, slots);
        if 1 + packer.best(i + 1, remaining - w, slots - 1) == here {
            chosen.push(i);
            remaining -= w;
            slots -= 1;
        }
    }
    chosen
}
