//! # Combinador por Prioridade
//!
//! Funde os conjuntos de menções de vários motores, já em coordenadas do texto
//! original, em um único conjunto **sem sobreposições**.
//!
//! ## Política
//! 1. `merged = {}`.
//! 2. Para cada motor, na ordem de prioridade, e para cada menção dele na ordem
//!    em que foi produzida: adiciona se não se sobrepõe a nada em `merged`.
//!
//! Motores anteriores sempre vencem conflitos; os seguintes só preenchem lacunas.
//! Nenhuma menção é cortada: a perdedora sai inteira. Dentro de um mesmo motor,
//! a primeira menção encontrada vence (desempate documentado, não é erro).
//!
//! A busca de conflito usa um índice ordenado por início (`BTreeMap`): como o
//! conjunto fundido é disjunto, basta olhar o último span que começa antes do
//! fim do candidato.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::EngineId;
use crate::span::{Span, SpanSet};

/// Nome padrão do produtor do conjunto fundido.
pub const COMBINER_ID: &str = "combiner";

/// Funde os conjuntos na ordem dada (o primeiro tem a maior prioridade).
pub fn combine(ordered: &[SpanSet]) -> SpanSet {
    combine_observed(ordered, EngineId::from(COMBINER_ID), |_, _| {})
}

/// Como [`combine`], informando cada decisão ao `observer`:
/// `(span, None)` quando mantido, `(span, Some(bloqueador))` quando descartado.
pub fn combine_observed<'a, I, F>(ordered: I, producer: EngineId, mut observer: F) -> SpanSet
where
    I: IntoIterator<Item = &'a SpanSet>,
    F: FnMut(&Span, Option<&Span>),
{
    let mut index: BTreeMap<usize, &'a Span> = BTreeMap::new();

    for set in ordered {
        for span in set {
            if span.is_empty() {
                warn!(producer = %set.producer, "span degenerado ignorado: {span}");
                continue;
            }

            let blocker = index
                .range(..span.end)
                .next_back()
                .map(|(_, kept)| *kept)
                .filter(|kept| kept.end > span.start);

            match blocker {
                Some(kept) => observer(span, Some(kept)),
                None => {
                    observer(span, None);
                    index.insert(span.start, span);
                }
            }
        }
    }

    SpanSet {
        producer,
        spans: index.into_values().cloned().collect(),
    }
}

/// Combinador configurado com uma ordem de prioridade explícita entre motores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combiner {
    pub name: EngineId,
    pub priority: Vec<EngineId>,
}

impl Combiner {
    pub fn new(priority: Vec<EngineId>) -> Self {
        Self {
            name: EngineId::from(COMBINER_ID),
            priority,
        }
    }

    /// Conjuntos na ordem de prioridade. Motores fora da lista são ignorados com
    /// aviso; motores da lista sem conjunto (ex: falharam) são simplesmente pulados.
    pub fn order<'a>(&self, sets: &'a HashMap<EngineId, SpanSet>) -> Vec<&'a SpanSet> {
        for engine in sets.keys() {
            if !self.priority.contains(engine) {
                warn!(%engine, "motor fora da ordem de prioridade, contribuição ignorada");
            }
        }

        self.priority
            .iter()
            .filter_map(|engine| {
                let set = sets.get(engine);
                if set.is_none() {
                    debug!(%engine, "sem contribuição deste motor");
                }
                set
            })
            .collect()
    }

    pub fn combine_by_priority(&self, sets: &HashMap<EngineId, SpanSet>) -> SpanSet {
        self.combine_by_priority_observed(sets, |_, _| {})
    }

    pub fn combine_by_priority_observed<F>(&self, sets: &HashMap<EngineId, SpanSet>, observer: F) -> SpanSet
    where
        F: FnMut(&Span, Option<&Span>),
    {
        combine_observed(self.order(sets), self.name.clone(), observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::span::overlaps;
    use proptest::prelude::*;

    fn span(engine: &str, start: usize, end: usize) -> Span {
        Span {
            entity_type: EntityType::Person,
            start,
            end,
            engine: EngineId::from(engine),
            text: String::new(),
        }
    }

    fn set(engine: &str, ranges: &[(usize, usize)]) -> SpanSet {
        let mut s = SpanSet::new(EngineId::from(engine));
        s.extend(ranges.iter().map(|&(a, b)| span(engine, a, b)));
        s
    }

    fn ranges(set: &SpanSet) -> Vec<(usize, usize)> {
        set.iter().map(|s| (s.start, s.end)).collect()
    }

    #[test]
    fn test_higher_priority_wins() {
        let a = set("a", &[(0, 5)]);
        let b = set("b", &[(3, 8), (10, 15)]);
        let merged = combine(&[a, b]);
        assert_eq!(ranges(&merged), vec![(0, 5), (10, 15)]);
        assert_eq!(merged.producer, EngineId::from(COMBINER_ID));
        assert_eq!(merged.spans[1].engine, EngineId::from("b"));
    }

    #[test]
    fn test_adjacent_spans_are_kept() {
        let merged = combine(&[set("a", &[(0, 5)]), set("b", &[(5, 8)])]);
        assert_eq!(ranges(&merged), vec![(0, 5), (5, 8)]);
    }

    #[test]
    fn test_same_tier_first_wins() {
        let merged = combine(&[set("a", &[(4, 9), (0, 6), (9, 12)])]);
        assert_eq!(ranges(&merged), vec![(4, 9), (9, 12)]);
    }

    #[test]
    fn test_loser_is_dropped_whole() {
        // [2,20) toca dois spans mantidos: sai inteiro, sem corte
        let merged = combine(&[set("a", &[(0, 4), (10, 12)]), set("b", &[(2, 20), (13, 14)])]);
        assert_eq!(ranges(&merged), vec![(0, 4), (10, 12), (13, 14)]);
    }

    #[test]
    fn test_blocker_detected_beyond_predecessor() {
        // o último span antes do fim do candidato não é o único que pode conflitar
        let merged = combine(&[set("a", &[(0, 5), (6, 8)]), set("b", &[(3, 7)])]);
        assert_eq!(ranges(&merged), vec![(0, 5), (6, 8)]);
    }

    #[test]
    fn test_observer_reports_decisions() {
        let a = set("a", &[(0, 5)]);
        let b = set("b", &[(3, 8), (10, 15)]);
        let mut kept = 0;
        let mut dropped = Vec::new();
        combine_observed([&a, &b], EngineId::from("x"), |s, blocker| match blocker {
            None => kept += 1,
            Some(bl) => dropped.push(((s.start, s.end), (bl.start, bl.end))),
        });
        assert_eq!(kept, 2);
        assert_eq!(dropped, vec![((3, 8), (0, 5))]);
    }

    #[test]
    fn test_combine_by_priority() {
        let mut sets = HashMap::new();
        sets.insert(EngineId::from("nero"), set("nero", &[(0, 10)]));
        sets.insert(EngineId::from("dater"), set("dater", &[(6, 10)]));
        sets.insert(EngineId::from("intrus"), set("intrus", &[(20, 25)]));

        let combiner = Combiner::new(vec!["dater".into(), "tagen".into(), "nero".into()]);
        let merged = combiner.combine_by_priority(&sets);
        // dater vence nero; tagen não contribuiu; intrus está fora da prioridade
        assert_eq!(ranges(&merged), vec![(6, 10)]);
        assert_eq!(merged.spans[0].engine, EngineId::from("dater"));
    }

    #[test]
    fn test_degenerate_spans_are_skipped() {
        // [5,5) não pode apagar [5,8) do índice
        let merged = combine(&[set("a", &[(5, 8)]), set("b", &[(5, 5), (9, 3)])]);
        assert_eq!(ranges(&merged), vec![(5, 8)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(combine(&[]).is_empty());
    }

    fn arb_sets() -> impl Strategy<Value = Vec<Vec<(usize, usize)>>> {
        prop::collection::vec(
            prop::collection::vec((0usize..100, 1usize..15).prop_map(|(s, l)| (s, s + l)), 0..12),
            0..5,
        )
    }

    proptest! {
        #[test]
        fn prop_result_never_overlaps(raw in arb_sets()) {
            let sets: Vec<SpanSet> = raw
                .iter()
                .enumerate()
                .map(|(k, r)| set(&format!("e{k}"), r))
                .collect();
            let merged = combine(&sets);
            for (x, a) in merged.spans.iter().enumerate() {
                for b in &merged.spans[x + 1..] {
                    prop_assert!(!overlaps(a, b), "{} x {}", a, b);
                }
            }
        }

        #[test]
        fn prop_every_dropped_span_is_blocked(raw in arb_sets()) {
            let sets: Vec<SpanSet> = raw
                .iter()
                .enumerate()
                .map(|(k, r)| set(&format!("e{k}"), r))
                .collect();
            let merged = combine(&sets);
            for s in sets.iter().flat_map(|s| s.iter()) {
                let kept = merged.spans.contains(s);
                let blocked = merged.spans.iter().any(|m| overlaps(m, s));
                prop_assert!(kept || blocked);
            }
        }
    }
}
