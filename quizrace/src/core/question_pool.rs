use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// * `text` - Question text
/// * `options` - Answer options in authored order
/// * `correct_idx` - Index of the correct option
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub correct_idx: usize,
}

impl Question {
    pub fn is_correct(&self, option_idx: usize) -> bool {
        option_idx == self.correct_idx
    }
}

/// QuestionPool hands out questions without replacement within one pass. Once a pass is
/// exhausted the traversal order is reshuffled (Fisher-Yates) and restarted. The first question
/// of a new pass never repeats the last one of the previous pass.
#[derive(Debug, Clone)]
pub struct QuestionPool {
    questions: Vec<Question>,
    order: Vec<usize>,
    cursor: usize,
    last_drawn: Option<usize>,
}

impl QuestionPool {
    pub fn new(questions: Vec<Question>) -> QuestionPool {
        let order = (0..questions.len()).collect();
        QuestionPool {
            questions,
            order,
            // forces a shuffle on the first draw
            cursor: usize::MAX,
            last_drawn: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn get(&self, question_idx: usize) -> Option<&Question> {
        self.questions.get(question_idx)
    }

    /// draw returns the index of the next question, None if the pool is empty.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.questions.is_empty() {
            return None;
        }

        if self.cursor >= self.order.len() {
            self.reshuffle(rng);
        }

        let question_idx = self.order[self.cursor];
        self.cursor += 1;
        self.last_drawn = Some(question_idx);
        Some(question_idx)
    }

    /// restart drops the current pass, the next draw starts a fresh shuffled pass.
    pub fn restart(&mut self) {
        self.cursor = usize::MAX;
        self.last_drawn = None;
    }

    fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);

        if let Some(last) = self.last_drawn {
            if self.order.len() > 1 && self.order[0] == last {
                let swap_idx = rng.gen_range(1..self.order.len());
                self.order.swap(0, swap_idx);
            }
        }

        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                text: format!("Q{}", i),
                options: vec!["a".to_owned(), "b".to_owned()],
                correct_idx: i % 2,
            })
            .collect()
    }

    #[test]
    fn empty_pool_draws_nothing() {
        let mut pool = QuestionPool::new(Vec::new());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pool.draw(&mut rng), None);
    }

    #[test]
    fn every_question_appears_once_per_pass() {
        let mut pool = QuestionPool::new(questions(5));
        let mut rng = StdRng::seed_from_u64(2);
        let n_draws = 23;
        let mut counts = vec![0usize; 5];

        for _ in 0..n_draws {
            counts[pool.draw(&mut rng).unwrap()] += 1;
        }

        for count in counts {
            assert!(count >= n_draws / 5);
        }
    }

    #[test]
    fn no_immediate_repeat_across_passes() {
        let mut pool = QuestionPool::new(questions(2));
        let mut rng = StdRng::seed_from_u64(3);
        let mut prev = pool.draw(&mut rng).unwrap();

        for _ in 0..100 {
            let cur = pool.draw(&mut rng).unwrap();
            assert_ne!(cur, prev);
            prev = cur;
        }
    }

    #[test]
    fn passes_are_reshuffled() {
        let mut pool = QuestionPool::new(questions(8));
        let mut rng = StdRng::seed_from_u64(4);
        let first: Vec<usize> = (0..8).map(|_| pool.draw(&mut rng).unwrap()).collect();
        let second: Vec<usize> = (0..8).map(|_| pool.draw(&mut rng).unwrap()).collect();
        assert_ne!(first, second);

        let mut sorted = second.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..8).collect::<Vec<usize>>());
    }

    #[test]
    fn single_question_pool_repeats() {
        let mut pool = QuestionPool::new(questions(1));
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(pool.draw(&mut rng), Some(0));
        assert_eq!(pool.draw(&mut rng), Some(0));
    }
}
