//! # Classes de Caracteres para o Alinhamento
//!
//! Funções pequenas e puras usadas pelas regras do [`crate::aligner`]:
//!
//! - **letra-ou-dígito**: decide se um caractere é "estrutural" (espaço, pontuação),
//!   podendo ser pulado quando os textos divergem.
//! - **dobra de acentos**: `é` → `e`, via decomposição NFD e remoção das marcas combinantes.
//! - **corridas de dígitos/tokens**: fim de `2014` ou de `quatorze` a partir de uma posição.
//! - **janela de contexto**: trecho legível em volta de uma posição, para mensagens de erro.
//!
//! Todas as posições são offsets de byte sobre fronteiras de `char`.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Raio padrão (em grafemas) das janelas de contexto.
pub const CONTEXT_RADIUS: usize = 20;

/// Caractere começando no byte `pos`, se houver.
pub fn char_at(text: &str, pos: usize) -> Option<char> {
    text.get(pos..).and_then(|rest| rest.chars().next())
}

pub fn is_letter_or_digit(c: char) -> bool {
    c.is_alphanumeric()
}

/// Remove o acento de um caractere (`é` → `e`, `Ç` → `C`).
///
/// Caracteres sem decomposição canônica (ex: `œ`, `ß`) são devolvidos intactos.
pub fn fold_accent(c: char) -> char {
    let mut bases = std::iter::once(c).nfd().filter(|ch| !is_combining_mark(*ch));
    match (bases.next(), bases.next()) {
        (Some(base), None) => base,
        _ => c,
    }
}

/// Letra acentuada: sua forma sem acento difere dela mesma.
pub fn is_accented(c: char) -> bool {
    c.is_alphabetic() && fold_accent(c) != c
}

/// Dígito em qualquer escrita (`7`, `٧`, `७`), o mesmo critério de [`digit_run_end`].
pub fn is_digit(c: char) -> bool {
    c.is_numeric()
}

/// Fim (exclusivo) da corrida máxima de dígitos que começa em `pos`.
pub fn digit_run_end(text: &str, pos: usize) -> usize {
    run_end(text, pos, is_digit)
}

/// Fim (exclusivo) do token letra-ou-dígito que começa em `pos`.
///
/// O token termina no primeiro delimitador: qualquer caractere que não seja
/// letra ou dígito (o que inclui `<`, início de marcação).
pub fn token_run_end(text: &str, pos: usize) -> usize {
    run_end(text, pos, is_letter_or_digit)
}

fn run_end(text: &str, pos: usize, keep: impl Fn(char) -> bool) -> usize {
    let rest = &text[pos..];
    rest.char_indices()
        .find(|(_, c)| !keep(*c))
        .map(|(offset, _)| pos + offset)
        .unwrap_or(text.len())
}

/// Janela de contexto em volta de `pos`, com o grafema da posição entre colchetes.
///
/// Ex: `context_window("Paris is nice", 6, 3)` → `"is [i]s n"`.
/// Quebras de linha são exibidas como `⏎` para manter a mensagem em uma linha.
pub fn context_window(text: &str, pos: usize, radius: usize) -> String {
    let pos = floor_char_boundary(text, pos);
    let before: Vec<&str> = text[..pos].graphemes(true).rev().take(radius).collect();
    let mut after = text[pos..].graphemes(true);
    let current = after.next().unwrap_or("");

    let mut out = String::new();
    for g in before.iter().rev() {
        out.push_str(g);
    }
    out.push('[');
    out.push_str(current);
    out.push(']');
    for g in after.take(radius) {
        out.push_str(g);
    }
    out.replace('\n', "⏎")
}

fn floor_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}
