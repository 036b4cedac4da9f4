use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lessonforge_core::engine::{record_response, start_attempt_with_rng, submit};
use lessonforge_core::model::{AnswerKey, Attempt, Question, Quiz, Response};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn make_quiz(questions: usize) -> Quiz {
    let questions = (0..questions)
        .map(|i| {
            let answer = match i % 3 {
                0 => AnswerKey::SingleChoice { correct_answer: 1 },
                1 => AnswerKey::MultiChoice {
                    correct_answers: vec![0, 2, 3],
                },
                _ => AnswerKey::Ordering {
                    correct_order: vec![3, 1, 0, 2],
                },
            };
            Question {
                prompt: format!("Question {i}"),
                options: (0..4).map(|o| format!("option {o}")).collect(),
                answer,
                explanation: String::new(),
            }
        })
        .collect();

    Quiz {
        id: 1,
        title: "Bench quiz".into(),
        description: String::new(),
        lesson_id: None,
        questions,
    }
}

fn answered_attempt(quiz: &Quiz) -> Attempt {
    let mut attempt = start_attempt_with_rng(quiz, &mut StdRng::seed_from_u64(42));
    for (i, question) in quiz.questions.iter().enumerate() {
        let response = match &question.answer {
            AnswerKey::SingleChoice { .. } => Response::SingleChoice(0),
            AnswerKey::MultiChoice { .. } => Response::multi([0, 1]),
            AnswerKey::Ordering { correct_order } => Response::Ordering(correct_order.clone()),
        };
        record_response(&mut attempt, i, response).unwrap();
    }
    attempt
}

fn bench_start_attempt(c: &mut Criterion) {
    let mut group = c.benchmark_group("start_attempt");

    for size in [5, 50, 500] {
        let quiz = make_quiz(size);
        group.bench_function(format!("questions={size}"), |b| {
            let mut rng = StdRng::seed_from_u64(7);
            b.iter(|| start_attempt_with_rng(black_box(&quiz), &mut rng))
        });
    }

    group.finish();
}

fn bench_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit");

    for size in [5, 50, 500] {
        let quiz = make_quiz(size);
        let attempt = answered_attempt(&quiz);
        group.bench_function(format!("questions={size}"), |b| {
            b.iter(|| {
                let mut attempt = attempt.clone();
                submit(black_box(&mut attempt), black_box(&quiz)).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_start_attempt, bench_submit);
criterion_main!(benches);
