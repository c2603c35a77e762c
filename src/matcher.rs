/// Strips the trailing qualifiers quiz banks put after the answer proper:
/// everything from the first `.` or `(` on.
pub fn canonical_answer(answer: &str) -> String {
    let end = answer.find(['.', '(']).unwrap_or(answer.len());
    answer[..end].trim().to_lowercase()
}

/// Decides whether a free-text reply matches the stored answer.
///
/// Either side containing the other is a match, so "это Пушкин" is accepted
/// for "Пушкин". This is permissive on purpose: a long reply that happens to
/// contain the answer is accepted too.
pub fn is_correct_answer(user_reply: &str, answer: &str) -> bool {
    let reply = user_reply.trim().to_lowercase();
    let answer = canonical_answer(answer);

    reply.contains(&answer) || answer.contains(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_matches() {
        for text in ["Париж", "Пушкин (поэт).", "42", "Лев Толстой"] {
            assert!(is_correct_answer(text, text), "{text}");
        }
    }

    #[test]
    fn parenthetical_and_case_are_ignored() {
        assert!(is_correct_answer("пушкин", "Пушкин (поэт)."));
        assert!(is_correct_answer("  ПАРИЖ ", "Париж. Столица Франции"));
    }

    #[test]
    fn extra_words_in_reply_are_tolerated() {
        assert!(is_correct_answer("это Пушкин", "Пушкин"));
    }

    #[test]
    fn partial_reply_is_accepted() {
        assert!(is_correct_answer("Толстой", "Лев Толстой"));
    }

    #[test]
    fn unrelated_reply_is_rejected() {
        assert!(!is_correct_answer("ничего общего", "Пушкин"));
        assert!(!is_correct_answer("Лондон", "Париж."));
    }

    #[test]
    fn canonical_answer_truncates_at_first_delimiter() {
        assert_eq!(canonical_answer("Пушкин (поэт)."), "пушкин");
        assert_eq!(canonical_answer("Т.е. что угодно"), "т");
        assert_eq!(canonical_answer(" Москва "), "москва");
    }
}
