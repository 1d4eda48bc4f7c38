use crate::markdown::{ProseLine, ProseLines};
use crate::schema::{LinkTarget, ParseWarning, WarningKind};

const SNIPPET_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkToken {
    Link(LinkTarget),
    Warning(ParseWarning),
}

/// Lazy scan over the wiki-link tokens of a note's text.
///
/// Holds no state beyond its cursor, so scanning the same text again always
/// yields the same tokens.
pub struct LinkScanner<'a> {
    lines: ProseLines<'a>,
    current: Option<ProseLine<'a>>,
    pos: usize,
}

/// Every link and malformed-link warning in `text`, in text order.
pub fn scan_links(text: &str) -> LinkScanner<'_> {
    LinkScanner {
        lines: ProseLines::new(text),
        current: None,
        pos: 0,
    }
}

/// The link targets of `text`, in text order, duplicates included.
pub fn extract_links(text: &str) -> impl Iterator<Item = LinkTarget> + '_ {
    scan_links(text).filter_map(|token| match token {
        LinkToken::Link(target) => Some(target),
        LinkToken::Warning(_) => None,
    })
}

impl Iterator for LinkScanner<'_> {
    type Item = LinkToken;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                self.current = Some(self.lines.next()?);
                self.pos = 0;
            }
            let line = self.current.as_ref()?;
            match scan_line(line, self.pos) {
                Some((token, next_pos)) => {
                    self.pos = next_pos;
                    if token.is_some() {
                        return token;
                    }
                }
                None => self.current = None,
            }
        }
    }
}

/// Next token at or after `from`, with the offset scanning resumes at.
/// `None` once the line holds no further `[[`.
fn scan_line(line: &ProseLine<'_>, from: usize) -> Option<(Option<LinkToken>, usize)> {
    let text = line.masked.as_ref();
    let open = from + text.get(from..)?.find("[[")?;
    let inner_start = open + 2;

    let Some(close) = text[inner_start..].find("]]") else {
        let warning = warning(line, open, WarningKind::UnterminatedLink);
        return Some((Some(LinkToken::Warning(warning)), text.len()));
    };
    let inner = &text[inner_start..inner_start + close];

    // `[[a [[b]]`: the first opener never closes, the second one does.
    if let Some(nested) = inner.find("[[") {
        let warning = warning(line, open, WarningKind::UnterminatedLink);
        return Some((Some(LinkToken::Warning(warning)), inner_start + nested));
    }

    let next = inner_start + close + 2;
    let embed = open > 0 && text.as_bytes()[open - 1] == b'!';
    let token = match split_target(inner) {
        Ok(Some(parts)) => Some(LinkToken::Link(LinkTarget {
            title: parts.title,
            raw: inner.to_string(),
            alias: parts.alias,
            anchor: parts.anchor,
            embed,
            line: line.number,
        })),
        Ok(None) => None,
        Err(kind) => Some(LinkToken::Warning(warning(line, open, kind))),
    };
    Some((token, next))
}

struct TargetParts {
    title: String,
    alias: Option<String>,
    anchor: Option<String>,
}

/// Split `Folder/Title.md#Anchor|Alias` into its parts.
///
/// `Ok(None)` is a same-note anchor (`#Heading`) that references no other note.
fn split_target(inner: &str) -> Result<Option<TargetParts>, WarningKind> {
    let (target, alias) = match inner.split_once('|') {
        Some((target, alias)) => (target, non_empty(alias)),
        None => (inner, None),
    };
    // Inside Markdown tables the pipe is written `\|`.
    let target = target.strip_suffix('\\').unwrap_or(target);

    let (path, anchor) = match target.split_once('#') {
        Some((path, anchor)) => (path.trim(), non_empty(anchor)),
        None => (target.trim(), None),
    };

    if path.is_empty() {
        return match anchor {
            Some(_) => Ok(None),
            None => Err(WarningKind::EmptyTarget),
        };
    }

    let segment = path.rsplit('/').next().unwrap_or(path);
    let title = segment.strip_suffix(".md").unwrap_or(segment).trim();
    if title.is_empty() {
        return Err(WarningKind::EmptyTarget);
    }

    Ok(Some(TargetParts {
        title: title.to_string(),
        alias,
        anchor,
    }))
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn warning(line: &ProseLine<'_>, offset: usize, kind: WarningKind) -> ParseWarning {
    let snippet = line
        .original
        .get(offset..)
        .unwrap_or_default()
        .chars()
        .take(SNIPPET_CHARS)
        .collect();
    ParseWarning {
        kind,
        line: line.number,
        column: line.column(offset),
        snippet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(text: &str) -> Vec<String> {
        extract_links(text).map(|link| link.title).collect()
    }

    fn warnings(text: &str) -> Vec<ParseWarning> {
        scan_links(text)
            .filter_map(|token| match token {
                LinkToken::Warning(warning) => Some(warning),
                LinkToken::Link(_) => None,
            })
            .collect()
    }

    #[test]
    fn text_without_links_yields_nothing() {
        assert!(titles("").is_empty());
        assert!(titles("# npm\n\n| cmd | use |\n|---|---|\n| npm ci | install |").is_empty());
        assert!(titles("single [brackets] and ]] stray").is_empty());
    }

    #[test]
    fn alias_is_discarded() {
        let links = extract_links("See [[A|B]]").collect::<Vec<_>>();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "A");
        assert_eq!(links[0].alias.as_deref(), Some("B"));
        assert_eq!(links[0].raw, "A|B");
    }

    #[test]
    fn keeps_order_and_duplicates() {
        assert_eq!(titles("[[B]] [[C]]\n[[B]]"), vec!["B", "C", "B"]);
    }

    #[test]
    fn path_prefix_keeps_last_segment() {
        assert_eq!(
            titles("[[dev/npm/npm-basics|npm]] [[../Terraform.md]] [[./React]]"),
            vec!["npm-basics", "Terraform", "React"]
        );
    }

    #[test]
    fn anchors_are_split_off() {
        let links = extract_links("[[Vue#Composition API]] [[Express#^routing|routes]]")
            .collect::<Vec<_>>();
        assert_eq!(links[0].title, "Vue");
        assert_eq!(links[0].anchor.as_deref(), Some("Composition API"));
        assert_eq!(links[1].title, "Express");
        assert_eq!(links[1].anchor.as_deref(), Some("^routing"));
        assert_eq!(links[1].alias.as_deref(), Some("routes"));
    }

    #[test]
    fn same_note_anchor_is_not_a_cross_reference() {
        assert!(titles("jump to [[#Setup]]").is_empty());
        assert!(warnings("jump to [[#Setup]]").is_empty());
    }

    #[test]
    fn embeds_are_flagged() {
        let links = extract_links("![[diagram.png]] and [[Note]]").collect::<Vec<_>>();
        assert!(links[0].embed);
        assert_eq!(links[0].title, "diagram.png");
        assert!(!links[1].embed);
    }

    #[test]
    fn table_escaped_pipe() {
        assert_eq!(titles("| [[NestJS\\|Nest]] | framework |"), vec!["NestJS"]);
    }

    #[test]
    fn code_is_ignored() {
        let text = "```bash\nif [[ -f package.json ]]; then npm ci; fi\n```\nInline `[[x]]` but [[Real]]";
        assert_eq!(titles(text), vec!["Real"]);
    }

    #[test]
    fn line_numbers_are_one_based() {
        let links = extract_links("---\ntags: a\n---\n\n[[X]]").collect::<Vec<_>>();
        assert_eq!(links[0].line, 5);
    }

    #[test]
    fn unterminated_link_warns_and_scanning_continues() {
        let text = "open [[Broken\nthen [[Fine]]";
        assert_eq!(titles(text), vec!["Fine"]);
        let found = warnings(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, WarningKind::UnterminatedLink);
        assert_eq!((found[0].line, found[0].column), (1, 6));
        assert_eq!(found[0].snippet, "[[Broken");
    }

    #[test]
    fn nested_opener_recovers_inner_link() {
        let text = "[[a [[b]]";
        assert_eq!(titles(text), vec!["b"]);
        assert_eq!(warnings(text).len(), 1);
    }

    #[test]
    fn empty_targets_warn() {
        let found = warnings("[[]] [[|alias]] [[folder/]]");
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|w| w.kind == WarningKind::EmptyTarget));
        assert!(titles("[[]] [[|alias]] [[folder/]]").is_empty());
    }

    #[test]
    fn scanning_is_restartable() {
        let text = "See [[B]] and [[C|see C]] and [[oops";
        let first = scan_links(text).collect::<Vec<_>>();
        let second = scan_links(text).collect::<Vec<_>>();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
