//! # Alinhador de Textos — Reconciliação com Dois Cursores
//!
//! Motores externos devolvem uma **cópia transformada** do texto: acentos removidos,
//! espaços inseridos ou comidos, numerais reescritos, marcação inline. O alinhador
//! percorre os dois textos ao mesmo tempo e reconstrói as posições no original.
//!
//! ## Algoritmo
//!
//! Dois cursores: `i` (texto original) e `j` (texto transformado). A cada passo o par
//! `(c1, c2)` é classificado por regras em ordem fixa — a primeira que casar decide:
//!
//! 0. **Marcação** (`c2 == '<'`, só com a camada de [`crate::extractor`]): delegada.
//! 1. **Igualdade** exata: avança os dois.
//! 2. **Diacríticos** (se habilitado): `é`/`e` avança os dois; `é`/espaço avança só `i`.
//! 3. **Estrutural**: o lado que não for letra-ou-dígito avança (ou os dois).
//! 4. **Corrida de dígitos** (se habilitado): `14` no original contra `quatorze`
//!    no transformado; cada cursor pula sua própria corrida.
//! 5. Nada casou: [`Error::Alignment`] com as duas posições e contexto.
//!
//! Ao final, o que sobrar do original só pode ser espaço em branco; sobra no
//! transformado (fora marcação) é erro. Linear, sem retrocesso, determinístico.
//!
//! ## Projeção de offsets
//!
//! Motores que reportam `(tipo, início, fim)` no espaço do próprio texto de saída
//! passam por [`project_offsets`]: o alinhamento registra, para cada posição `j`,
//! onde `i` estava quando `j` foi consumido (início) e quando `j` foi alcançado (fim).

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::entity::EntityType;
use crate::error::{Error, Result};
use crate::profile::EngineProfile;
use crate::span::{build_span, correct_span, SpanSet};
use crate::text::{
    char_at, context_window, digit_run_end, fold_accent, is_accented, is_digit, is_letter_or_digit,
    token_run_end, CONTEXT_RADIUS,
};

/// Regra que decidiu um passo do alinhamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Equal,
    /// `é` contra `e`
    DiacriticFold,
    /// `é` contra espaço: o motor trocou a letra acentuada por espaço
    DiacriticSpace,
    Structural,
    DigitRun,
}

/// Como os cursores se movem num passo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Both,
    Original,
    Transformed,
    /// Cada cursor pula sua corrida (dígitos no original, token no transformado)
    Runs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub rule: Rule,
    pub advance: Advance,
}

impl Step {
    fn new(rule: Rule, advance: Advance) -> Self {
        Self { rule, advance }
    }
}

/// Classifica o par `(c1, c2)` aplicando as regras na ordem documentada.
///
/// `None` significa divergência irrecuperável.
pub fn classify(c1: char, c2: char, profile: &EngineProfile) -> Option<Step> {
    if c1 == c2 {
        return Some(Step::new(Rule::Equal, Advance::Both));
    }

    if profile.diacritic_skip {
        if fold_accent(c1) == fold_accent(c2) {
            return Some(Step::new(Rule::DiacriticFold, Advance::Both));
        }
        if is_accented(c1) && c2 == ' ' {
            return Some(Step::new(Rule::DiacriticSpace, Advance::Original));
        }
    }

    match (is_letter_or_digit(c1), is_letter_or_digit(c2)) {
        (false, false) => return Some(Step::new(Rule::Structural, Advance::Both)),
        (false, true) => return Some(Step::new(Rule::Structural, Advance::Original)),
        (true, false) => return Some(Step::new(Rule::Structural, Advance::Transformed)),
        (true, true) => {}
    }

    if profile.digit_run_skip && is_digit(c1) {
        return Some(Step::new(Rule::DigitRun, Advance::Runs));
    }

    None
}

/// Tag aberta na pilha do cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    pub name: String,
    /// `None` para tags ignoradas: não geram menção ao fechar
    pub entity_type: Option<EntityType>,
    /// Posição `i` no original quando a tag foi aberta
    pub start: usize,
    /// Intervalos `[início, fim)` das tags de intervalo fechadas dentro desta.
    /// Quando há algum, só eles viram menções, quebrados nos separadores.
    pub ranges: Vec<(usize, usize)>,
}

/// Mapa posição-no-transformado → posição-no-original, preenchido durante o alinhamento.
#[derive(Debug, Clone, Default)]
pub struct OffsetMap {
    /// `departure[j]`: valor de `i` quando o byte `j` foi consumido
    departure: Vec<usize>,
    /// `arrival[j]`: valor de `i` quando o cursor chegou em `j`
    arrival: Vec<usize>,
}

impl OffsetMap {
    fn new(transformed_len: usize) -> Self {
        Self {
            departure: vec![0; transformed_len],
            arrival: vec![0; transformed_len + 1],
        }
    }

    fn record(&mut self, i0: usize, i1: usize, j0: usize, j1: usize) {
        for k in j0..j1 {
            self.departure[k] = i0;
            self.arrival[k + 1] = i1;
        }
    }

    /// Posição no original onde começa o caractere transformado em `j`.
    pub fn original_start(&self, j: usize) -> Option<usize> {
        self.departure.get(j).copied()
    }

    /// Posição no original alcançada logo depois de consumir tudo antes de `j`.
    pub fn original_end(&self, j: usize) -> Option<usize> {
        self.arrival.get(j).copied()
    }
}

/// Estado de uma execução de alinhamento: criado por chamada e descartado ao final.
#[derive(Debug, Clone, Default)]
pub struct AlignmentCursor {
    /// Posição no texto original
    pub i: usize,
    /// Posição no texto transformado
    pub j: usize,
    pub(crate) stack: Vec<OpenTag>,
    offsets: Option<OffsetMap>,
}

impl AlignmentCursor {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_offsets(transformed_len: usize) -> Self {
        Self {
            offsets: Some(OffsetMap::new(transformed_len)),
            ..Self::default()
        }
    }

    /// Profundidade atual de marcação.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn advance(&mut self, di: usize, dj: usize) {
        self.move_to(self.i + di, self.j + dj);
    }

    pub(crate) fn move_to(&mut self, i1: usize, j1: usize) {
        if let Some(map) = self.offsets.as_mut() {
            map.record(self.i, i1, self.j, j1);
        }
        self.i = i1;
        self.j = j1;
    }
}

/// Camada de marcação acoplada ao laço de reconciliação (regra 0).
pub(crate) trait MarkupLayer {
    fn starts_markup(&self, c: char) -> bool;

    /// Consome a marcação em `cursor.j`, movendo apenas `j`.
    fn consume(&mut self, cursor: &mut AlignmentCursor, original: &str, transformed: &str) -> Result<()>;
}

/// Alinhamento puro: `<` é um caractere como outro qualquer.
pub(crate) struct NoMarkup;

impl MarkupLayer for NoMarkup {
    fn starts_markup(&self, _c: char) -> bool {
        false
    }

    fn consume(&mut self, _cursor: &mut AlignmentCursor, _original: &str, _transformed: &str) -> Result<()> {
        Ok(())
    }
}

/// Erro de divergência com as posições atuais e uma janela de contexto de cada texto.
pub(crate) fn divergence(
    original: &str,
    transformed: &str,
    i: usize,
    j: usize,
    reason: impl Into<String>,
) -> Error {
    Error::Alignment {
        original_pos: i,
        transformed_pos: j,
        reason: reason.into(),
        original_context: context_window(original, i, CONTEXT_RADIUS),
        transformed_context: context_window(transformed, j, CONTEXT_RADIUS),
    }
}

/// Laço principal de reconciliação, compartilhado pelo alinhamento puro e pelo extrator.
pub(crate) fn reconcile<M: MarkupLayer>(
    original: &str,
    transformed: &str,
    profile: &EngineProfile,
    mut cursor: AlignmentCursor,
    markup: &mut M,
) -> Result<AlignmentCursor> {
    while cursor.i < original.len() && cursor.j < transformed.len() {
        let (Some(c1), Some(c2)) = (char_at(original, cursor.i), char_at(transformed, cursor.j)) else {
            break;
        };

        if markup.starts_markup(c2) {
            markup.consume(&mut cursor, original, transformed)?;
            continue;
        }

        let step = classify(c1, c2, profile).ok_or_else(|| {
            divergence(
                original,
                transformed,
                cursor.i,
                cursor.j,
                format!("caracteres irreconciliáveis '{c1}' e '{c2}'"),
            )
        })?;

        match step.advance {
            Advance::Both => cursor.advance(c1.len_utf8(), c2.len_utf8()),
            Advance::Original => cursor.advance(c1.len_utf8(), 0),
            Advance::Transformed => cursor.advance(0, c2.len_utf8()),
            Advance::Runs => {
                let i1 = digit_run_end(original, cursor.i);
                let j1 = token_run_end(transformed, cursor.j);
                trace!(
                    original = &original[cursor.i..i1],
                    transformed = &transformed[cursor.j..j1],
                    "numeral reescrito pelo motor"
                );
                cursor.move_to(i1, j1);
            }
        }
    }

    finish(original, transformed, cursor, markup)
}

fn finish<M: MarkupLayer>(
    original: &str,
    transformed: &str,
    mut cursor: AlignmentCursor,
    markup: &mut M,
) -> Result<AlignmentCursor> {
    // marcação pendente depois do último caractere (ex: `</loc>` final)
    while let Some(c2) = char_at(transformed, cursor.j) {
        if !markup.starts_markup(c2) {
            break;
        }
        markup.consume(&mut cursor, original, transformed)?;
    }

    if cursor.i < original.len() {
        let rest = &original[cursor.i..];
        if let Some((offset, _)) = rest.char_indices().find(|(_, c)| !c.is_whitespace()) {
            return Err(divergence(
                original,
                transformed,
                cursor.i + offset,
                cursor.j,
                "o texto original não foi consumido até o fim",
            ));
        }
        cursor.i = original.len();
    }

    if cursor.j < transformed.len() {
        return Err(divergence(
            original,
            transformed,
            cursor.i,
            cursor.j,
            "o texto transformado não foi consumido até o fim",
        ));
    }

    if let Some(open) = cursor.stack.last() {
        return Err(divergence(
            original,
            transformed,
            open.start,
            cursor.j,
            format!("tag <{}> nunca foi fechada", open.name),
        ));
    }

    Ok(cursor)
}

/// Alinha sem interpretar marcação e devolve os cursores finais.
pub fn align_cursor(original: &str, transformed: &str, profile: &EngineProfile) -> Result<AlignmentCursor> {
    reconcile(original, transformed, profile, AlignmentCursor::new(), &mut NoMarkup)
}

/// Alinhamento puro: verifica que os textos se reconciliam.
///
/// Sem marcação não há menções; o conjunto devolvido é vazio e pertence ao motor
/// do perfil. Para extrair menções use [`crate::extractor::extract_tagged`] ou
/// [`project_offsets`].
pub fn align(original: &str, transformed: &str, profile: &EngineProfile) -> Result<SpanSet> {
    let cursor = align_cursor(original, transformed, profile)?;
    debug!(engine = %profile.engine, i = cursor.i, j = cursor.j, "alinhamento concluído");
    Ok(SpanSet::new(profile.engine.clone()))
}

/// Menção reportada por um motor no espaço do seu próprio texto de saída.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMention {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub start: usize,
    pub end: usize,
}

impl RawMention {
    pub fn new(entity_type: EntityType, start: usize, end: usize) -> Self {
        Self {
            entity_type,
            start,
            end,
        }
    }
}

/// Projeta menções do espaço do texto transformado para o texto original.
///
/// Offsets fora do texto do motor ou fora de fronteira de caractere abortam a
/// contribuição do motor ([`Error::InvalidSpan`]). Menções que encolhem até
/// sumir (ex: cobriam só pontuação inserida pelo motor) são descartadas com aviso.
pub fn project_offsets(
    original: &str,
    transformed: &str,
    mentions: &[RawMention],
    profile: &EngineProfile,
) -> Result<SpanSet> {
    let mut cursor = reconcile(
        original,
        transformed,
        profile,
        AlignmentCursor::with_offsets(transformed.len()),
        &mut NoMarkup,
    )?;
    let map = cursor.offsets.take().unwrap_or_default();

    let mut result = SpanSet::new(profile.engine.clone());
    for mention in mentions {
        let valid = mention.start < mention.end
            && mention.end <= transformed.len()
            && transformed.is_char_boundary(mention.start)
            && transformed.is_char_boundary(mention.end);
        if !valid {
            return Err(Error::invalid_span(
                mention.start,
                mention.end,
                transformed.len(),
                "menção inválida no texto do motor",
            ));
        }

        let (Some(start), Some(end)) = (map.original_start(mention.start), map.original_end(mention.end)) else {
            return Err(Error::invalid_span(
                mention.start,
                mention.end,
                transformed.len(),
                "offset sem correspondência no original",
            ));
        };
        if start >= end {
            warn!(engine = %profile.engine, start = mention.start, end = mention.end, "menção sem correspondência no texto original, descartada");
            continue;
        }

        let raw = build_span(mention.entity_type, start, end, profile.engine.clone(), original)?;
        match correct_span(&raw, original) {
            Ok(span) => result.push(span),
            Err(e) => warn!(engine = %profile.engine, "menção descartada: {e}"),
        }
    }
    Ok(result)
}
