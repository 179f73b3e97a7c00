//! Paged introduction text and its navigation.
//!
//! Navigation is split in two: [`previous`] and [`next`] are pure functions from
//! a [`DialogueCursor`] to a [`NavOutcome`], and [`DialoguePresenter`] owns the
//! cursor and applies outcomes to the overlay.

use crate::ui::{ElementId, Overlay, UiError};

/// Opacity of a navigator that still has a page in its direction.
pub const ACTIVE_OPACITY: f32 = 1.0;
/// Opacity of a navigator at the edge of its section.
pub const BOUNDARY_OPACITY: f32 = 0.5;

/// A static table of sections, each an ordered list of pages.
#[derive(Clone, Copy, Debug)]
pub struct DialogueText {
    sections: &'static [&'static [&'static str]],
}

impl DialogueText {
    pub const fn new(sections: &'static [&'static [&'static str]]) -> Self {
        Self { sections }
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Number of pages in `section`, zero when the section does not exist.
    pub fn page_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, |pages| pages.len())
    }

    pub fn page(&self, section: usize, page: usize) -> Option<&'static str> {
        self.sections.get(section)?.get(page).copied()
    }
}

pub mod texts {
    use super::DialogueText;

    pub const INTRODUCTION: DialogueText = DialogueText::new(&[&[
        "The art world is a challenging dimension to enter and understand: the space of what can be defined as art has widened incredibly in the last decades, and, as with almost everything else, the pace at which it’s progressing has left many people behind. The technical language to describe it has evolved, including sciences, philosophy, and several other very complex categories, but its often misuse creates even more considerable confusion among the general public.",
        "Artioma exists with this phenomenon in mind. It tries to create a satire of the art jargon while simultaneously creating a platform that people can use to interface themselves directly with works of different art universities to better understand the plethora of languages inside them; its function is to critique and teach.",
        "Peter Gelderloos, an American anarchist and activist, in his 2003 article Elitist Language, makes a compelling argument, which serves as the basis of our project:\n'We should use the forms of language we’re comfortable with, academic or otherwise, as long as we do it lucidly, in a way that invites learning and sharing of that knowledge. [...] (We have to) Recognize the variety of languages, but upset the economic, racial, and gendered hierarchy in which these languages have been placed.'",
        "Our final objective is to help the general public understand the modern art industry by analyzing the projects of the new generation of university artists. We showcase contemporary art using a platform that the universities can use to understand the challenges of writing about art in an accessible way, hopefully encouraging students to do so.",
    ]]);
}

/// Position within a [`DialogueText`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DialogueCursor {
    pub section: usize,
    pub page: usize,
}

/// Result of a navigation step: the new cursor and the opacity of both
/// navigator controls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavOutcome {
    pub cursor: DialogueCursor,
    pub moved: bool,
    pub prev_opacity: f32,
    pub next_opacity: f32,
}

/// Control opacities for a cursor without moving it.
pub fn settle(cursor: DialogueCursor, text: &DialogueText) -> NavOutcome {
    let has_prev = cursor.page > 0 && text.page(cursor.section, cursor.page - 1).is_some();
    let has_next = text.page(cursor.section, cursor.page + 1).is_some();

    NavOutcome {
        cursor,
        moved: false,
        prev_opacity: if has_prev { ACTIVE_OPACITY } else { BOUNDARY_OPACITY },
        next_opacity: if has_next { ACTIVE_OPACITY } else { BOUNDARY_OPACITY },
    }
}

/// Step back one page if a page exists there.
pub fn previous(cursor: DialogueCursor, text: &DialogueText) -> NavOutcome {
    let target = cursor
        .page
        .checked_sub(1)
        .filter(|&page| text.page(cursor.section, page).is_some());

    match target {
        Some(page) => NavOutcome {
            moved: true,
            ..settle(DialogueCursor { page, ..cursor }, text)
        },
        None => settle(cursor, text),
    }
}

/// Step forward one page if a page exists there.
pub fn next(cursor: DialogueCursor, text: &DialogueText) -> NavOutcome {
    let page = cursor.page + 1;
    if text.page(cursor.section, page).is_some() {
        NavOutcome {
            moved: true,
            ..settle(DialogueCursor { page, ..cursor }, text)
        }
    } else {
        settle(cursor, text)
    }
}

/// Owns the page cursor and pushes it to the overlay.
#[derive(Clone, Debug)]
pub struct DialoguePresenter {
    text: DialogueText,
    cursor: DialogueCursor,
}

impl DialoguePresenter {
    pub fn new(text: DialogueText) -> Self {
        Self {
            text,
            cursor: DialogueCursor::default(),
        }
    }

    pub fn cursor(&self) -> DialogueCursor {
        self.cursor
    }

    /// Write the current page and navigator opacities to the overlay.
    pub fn show(&self, overlay: &mut Overlay) -> Result<NavOutcome, UiError> {
        let outcome = settle(self.cursor, &self.text);
        self.apply(outcome, overlay)?;
        Ok(outcome)
    }

    pub fn previous(&mut self, overlay: &mut Overlay) -> Result<NavOutcome, UiError> {
        let outcome = previous(self.cursor, &self.text);
        self.cursor = outcome.cursor;
        self.apply(outcome, overlay)?;
        Ok(outcome)
    }

    pub fn next(&mut self, overlay: &mut Overlay) -> Result<NavOutcome, UiError> {
        let outcome = next(self.cursor, &self.text);
        self.cursor = outcome.cursor;
        self.apply(outcome, overlay)?;
        Ok(outcome)
    }

    fn apply(&self, outcome: NavOutcome, overlay: &mut Overlay) -> Result<(), UiError> {
        let page = self
            .text
            .page(outcome.cursor.section, outcome.cursor.page)
            .unwrap_or_default();
        overlay.element_mut(ElementId::Description)?.text = page.to_string();
        overlay.element_mut(ElementId::NavigatorSx)?.opacity = outcome.prev_opacity;
        overlay.element_mut(ElementId::NavigatorDx)?.opacity = outcome.next_opacity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOUR_PAGES: DialogueText = DialogueText::new(&[&["one", "two", "three", "four"]]);

    #[test]
    fn previous_at_first_page_stays_put() {
        let start = DialogueCursor::default();
        let first = previous(start, &FOUR_PAGES);
        let again = previous(first.cursor, &FOUR_PAGES);

        assert_eq!(first.cursor.page, 0);
        assert!(!first.moved);
        assert_eq!(first.prev_opacity, BOUNDARY_OPACITY);
        assert_eq!(first, again);
    }

    #[test]
    fn next_walks_to_last_page_then_stops() {
        let mut cursor = DialogueCursor::default();
        let mut outcome = settle(cursor, &FOUR_PAGES);
        for _ in 0..3 {
            outcome = next(cursor, &FOUR_PAGES);
            assert!(outcome.moved);
            cursor = outcome.cursor;
        }

        assert_eq!(cursor.page, 3);
        assert_eq!(outcome.next_opacity, BOUNDARY_OPACITY);
        assert_eq!(outcome.prev_opacity, ACTIVE_OPACITY);

        let fourth = next(cursor, &FOUR_PAGES);
        assert!(!fourth.moved);
        assert_eq!(fourth.cursor.page, 3);
    }

    #[test]
    fn middle_pages_enable_both_controls() {
        let outcome = next(DialogueCursor::default(), &FOUR_PAGES);
        assert_eq!(outcome.prev_opacity, ACTIVE_OPACITY);
        assert_eq!(outcome.next_opacity, ACTIVE_OPACITY);
    }

    #[test]
    fn missing_section_never_moves() {
        let cursor = DialogueCursor {
            section: 7,
            page: 0,
        };
        assert!(!next(cursor, &FOUR_PAGES).moved);
        assert!(!previous(cursor, &FOUR_PAGES).moved);
    }

    #[test]
    fn introduction_has_four_pages() {
        assert_eq!(texts::INTRODUCTION.section_count(), 1);
        assert_eq!(texts::INTRODUCTION.page_count(0), 4);
    }

    #[test]
    fn presenter_updates_overlay() {
        let mut overlay = Overlay::new(1280.0, 720.0);
        let mut presenter = DialoguePresenter::new(FOUR_PAGES);
        presenter.show(&mut overlay).unwrap();

        let sx = overlay.element(ElementId::NavigatorSx).unwrap();
        assert_eq!(sx.opacity, BOUNDARY_OPACITY);

        presenter.next(&mut overlay).unwrap();
        assert_eq!(overlay.element(ElementId::Description).unwrap().text, "two");
        assert_eq!(
            overlay.element(ElementId::NavigatorSx).unwrap().opacity,
            ACTIVE_OPACITY
        );
    }

    #[test]
    fn presenter_reports_missing_elements() {
        let mut overlay = Overlay::new(1280.0, 720.0);
        overlay.remove(ElementId::Description);
        let mut presenter = DialoguePresenter::new(FOUR_PAGES);

        assert_eq!(
            presenter.next(&mut overlay).unwrap_err(),
            UiError::MissingElement(ElementId::Description)
        );
    }
}
