// tests/model_tests.rs
//
// Query-layer tests against a real Postgres. Skipped when DATABASE_URL is unset.

use chrono::{DateTime, Duration, Months, Utc};
use classroom::{
    models::{
        class::{Class, CreateClassRequest},
        exam::{CreateExamRequest, Exam},
        exercise::{CreateExerciseRequest, Exercise, ScheduleExerciseRequest, ScheduledExercise},
        submission::{CreateSubmissionRequest, Outcome, Submission, UpdateSubmissionRequest},
        user::{Role, User},
    },
    services::{classes, exams, exercises, interactions, submissions, users},
};
use sqlx::{PgPool, postgres::PgPoolOptions};

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(pool)
}

async fn create_user(pool: &PgPool, role: Role) -> User {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..12]);
    users::create(pool, &username, "not-a-real-hash", role)
        .await
        .unwrap()
}

async fn create_class(pool: &PgPool, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Class {
    classes::create(
        pool,
        &CreateClassRequest {
            name: "turma".into(),
            starts_at,
            ends_at,
        },
    )
    .await
    .unwrap()
}

async fn create_current_class(pool: &PgPool) -> Class {
    let now = Utc::now();
    create_class(pool, now - Months::new(2), now + Months::new(2)).await
}

async fn create_exercise(pool: &PgPool, published: bool) -> Exercise {
    exercises::create(
        pool,
        &CreateExerciseRequest {
            title: "Hello World".into(),
            description: r#"Escreva um programa que imprime "Olá, Raimundo!""#.into(),
            published,
        },
    )
    .await
    .unwrap()
}

async fn schedule(
    pool: &PgPool,
    class: &Class,
    exercise: &Exercise,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> ScheduledExercise {
    exercises::schedule(
        pool,
        class.id,
        &ScheduleExerciseRequest {
            exercise_id: exercise.id,
            starts_at,
            ends_at,
        },
    )
    .await
    .unwrap()
}

async fn create_exam(
    pool: &PgPool,
    class: &Class,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    exercises: &[&Exercise],
) -> Exam {
    exams::create(
        pool,
        &CreateExamRequest {
            class_id: class.id,
            title: "Prova".into(),
            starts_at,
            ends_at,
            exercise_ids: exercises.iter().map(|e| e.id).collect(),
        },
    )
    .await
    .unwrap()
}

async fn submit(
    pool: &PgPool,
    user: &User,
    exercise: &Exercise,
    outcome: Outcome,
    submitted_at: DateTime<Utc>,
) -> Submission {
    submissions::create(
        pool,
        user.id,
        exercise.id,
        &CreateSubmissionRequest {
            outcome,
            source: "print('Olá')".into(),
            failures: vec![],
            stack_traces: vec![],
        },
        submitted_at,
    )
    .await
    .unwrap()
}

fn ids<T>(list: &[T], id: impl Fn(&T) -> i64) -> Vec<i64> {
    list.iter().map(id).collect()
}

#[tokio::test]
async fn released_current_classes() {
    let Some(pool) = test_pool().await else { return };
    let student = create_user(&pool, Role::Student).await;
    let released = create_user(&pool, Role::Student).await;
    let class = create_current_class(&pool).await;
    classes::enroll(&pool, class.id, student.id, false).await.unwrap();
    classes::enroll(&pool, class.id, released.id, true).await.unwrap();

    let now = Utc::now();
    assert_eq!(classes::released_current(&pool, student.id, now).await.unwrap().len(), 0);
    assert_eq!(classes::released_current(&pool, released.id, now).await.unwrap().len(), 1);
}

#[tokio::test]
async fn enrolled_students_across_overlapping_classes() {
    let Some(pool) = test_pool().await else { return };
    let now = Utc::now();

    // Two classes per year, half of each class carries over from the previous one
    let mut all_classes = Vec::new();
    for year in [-1i32, -1, 0, 0, 1, 1] {
        let shift = |d: DateTime<Utc>, months: i32| {
            let total = months + 12 * year;
            if total >= 0 {
                d + Months::new(total as u32)
            } else {
                d - Months::new(total.unsigned_abs())
            }
        };
        all_classes.push(create_class(&pool, shift(now, -2), shift(now, 2)).await);
    }

    let mut students = vec![create_user(&pool, Role::Student).await];
    let mut members = Vec::new();
    for class in &all_classes {
        students.push(create_user(&pool, Role::Student).await);
        let pair = &students[students.len() - 2..];
        for s in pair {
            classes::enroll(&pool, class.id, s.id, false).await.unwrap();
        }
        members.push(ids(pair, |u| u.id));
    }

    for (class, enrolled) in all_classes.iter().zip(&members) {
        for student in &students {
            let expected = enrolled.contains(&student.id);
            assert_eq!(
                classes::is_enrolled(&pool, class.id, student.id).await.unwrap(),
                expected
            );
        }
    }
}

#[tokio::test]
async fn enrolling_twice_conflicts() {
    let Some(pool) = test_pool().await else { return };
    let student = create_user(&pool, Role::Student).await;
    let class = create_current_class(&pool).await;
    classes::enroll(&pool, class.id, student.id, false).await.unwrap();

    let err = classes::enroll(&pool, class.id, student.id, true).await.unwrap_err();
    assert!(matches!(err, classroom::error::AppError::Conflict(_)));
}

struct ManyClasses {
    now: DateTime<Utc>,
    last_year: DateTime<Utc>,
    last_month: DateTime<Utc>,
    student1: User,
    student2: User,
    class1: Class,
    class2: Class,
    class3: Class,
    class4: Class,
}

async fn many_classes(pool: &PgPool) -> ManyClasses {
    let now = Utc::now();
    let last_year = now - Months::new(12);
    let last_month = now - Months::new(1);

    let student1 = create_user(pool, Role::Student).await;
    let student2 = create_user(pool, Role::Student).await;

    let class1 = create_class(pool, now - Months::new(2), now - Duration::days(1)).await;
    let class2 = create_class(pool, last_year, now + Months::new(12)).await;
    let class3 = create_class(pool, last_month, now + Duration::days(1)).await;
    let class4 = create_class(pool, now - Duration::days(1), now + Months::new(4)).await;

    for (class, student) in [
        (&class1, &student1),
        (&class3, &student1),
        (&class4, &student1),
        (&class1, &student2),
        (&class2, &student2),
    ] {
        classes::enroll(pool, class.id, student.id, false).await.unwrap();
    }

    ManyClasses {
        now,
        last_year,
        last_month,
        student1,
        student2,
        class1,
        class2,
        class3,
        class4,
    }
}

#[tokio::test]
async fn date_range_of_student() {
    let Some(pool) = test_pool().await else { return };
    let f = many_classes(&pool).await;

    let range1 = classes::date_range(&pool, f.student1.id, f.now).await.unwrap();
    let range2 = classes::date_range(&pool, f.student2.id, f.now).await.unwrap();

    assert_eq!(range1.start_date, f.last_month.date_naive());
    assert_eq!(range2.start_date, f.last_year.date_naive());
    assert_eq!(range1.end_date, f.now.date_naive());
    assert_eq!(range2.end_date, f.now.date_naive());
}

#[tokio::test]
async fn classes_of_student() {
    let Some(pool) = test_pool().await else { return };
    let f = many_classes(&pool).await;

    let classes1 = ids(&classes::of_student(&pool, f.student1.id).await.unwrap(), |c| c.id);
    assert_eq!(classes1.len(), 3);
    for c in [&f.class1, &f.class3, &f.class4] {
        assert!(classes1.contains(&c.id));
    }

    let classes2 = ids(&classes::of_student(&pool, f.student2.id).await.unwrap(), |c| c.id);
    assert_eq!(classes2.len(), 2);
    assert!(classes2.contains(&f.class1.id) && classes2.contains(&f.class2.id));

    let current1 = classes::current_of_student(&pool, f.student1.id, f.now).await.unwrap();
    assert_eq!(ids(&current1, |c| c.id).len(), 2);
    assert!(current1.contains(&f.class3) && current1.contains(&f.class4));

    let current2 = classes::current_of_student(&pool, f.student2.id, f.now).await.unwrap();
    assert_eq!(current2, vec![f.class2.clone()]);

    // Same result from the global "current" filter intersected with enrollment
    let current = ids(&classes::current(&pool, f.now).await.unwrap(), |c| c.id);
    assert!(current.contains(&f.class2.id));
    assert!(!current.contains(&f.class1.id));
}

#[tokio::test]
async fn lists_only_published_exercises() {
    let Some(pool) = test_pool().await else { return };
    let published = create_exercise(&pool, true).await;
    let hidden = create_exercise(&pool, false).await;

    let list = ids(&exercises::published(&pool).await.unwrap(), |e| e.id);
    assert!(list.contains(&published.id));
    assert!(!list.contains(&hidden.id));

    exercises::set_published(&pool, hidden.id, true).await.unwrap();
    let list = ids(&exercises::published(&pool).await.unwrap(), |e| e.id);
    assert!(list.contains(&hidden.id));
}

#[tokio::test]
async fn submissions_hide_deleted_and_other_authors() {
    let Some(pool) = test_pool().await else { return };
    let author = create_user(&pool, Role::Student).await;
    let other = create_user(&pool, Role::Student).await;
    let exercise = create_exercise(&pool, true).await;
    let now = Utc::now();

    let success = submit(&pool, &author, &exercise, Outcome::Ok, now).await;
    let failure = submit(&pool, &author, &exercise, Outcome::Error, now).await;
    let deleted = submit(&pool, &author, &exercise, Outcome::Error, now).await;
    submissions::soft_delete(&pool, deleted.id).await.unwrap();
    let from_other = submit(&pool, &other, &exercise, Outcome::Ok, now).await;

    assert!(success.succeeded());
    assert!(!failure.succeeded());

    let all = ids(&submissions::all(&pool).await.unwrap(), |s| s.id);
    assert!(all.contains(&success.id) && all.contains(&failure.id));
    assert!(!all.contains(&deleted.id));

    let mine = ids(&submissions::by_author(&pool, author.id, None).await.unwrap(), |s| s.id);
    assert!(mine.contains(&success.id) && mine.contains(&failure.id));
    assert!(!mine.contains(&from_other.id));
    assert!(!mine.contains(&deleted.id));

    assert!(submissions::get(&pool, deleted.id).await.is_err());
}

#[tokio::test]
async fn latest_submission() {
    let Some(pool) = test_pool().await else { return };
    let author = create_user(&pool, Role::Student).await;
    let exercise = create_exercise(&pool, true).await;
    let now = Utc::now();

    assert!(submissions::latest(&pool, author.id, exercise.id).await.unwrap().is_none());

    submit(&pool, &author, &exercise, Outcome::Error, now - Duration::hours(2)).await;
    let newest = submit(&pool, &author, &exercise, Outcome::Ok, now).await;
    submit(&pool, &author, &exercise, Outcome::Error, now - Duration::hours(1)).await;

    let latest = submissions::latest(&pool, author.id, exercise.id).await.unwrap().unwrap();
    assert_eq!(latest.id, newest.id);
}

#[tokio::test]
async fn counts_exercises_per_day() {
    let Some(pool) = test_pool().await else { return };
    let student = create_user(&pool, Role::Student).await;
    let now = Utc::now();
    let days = 3;
    let first_day = (now - Duration::days(2 * (days - 1))).date_naive();
    let exercise_list = [
        create_exercise(&pool, true).await,
        create_exercise(&pool, true).await,
        create_exercise(&pool, true).await,
    ];

    for i in 0..days {
        for exercise in &exercise_list[..=(i as usize)] {
            submit(&pool, &student, exercise, Outcome::Ok, now - Duration::days(2 * i)).await;
        }
    }

    let read = |counts: &classroom::models::submission::DailyCounts| -> Vec<usize> {
        first_day.iter_days().take(5).map(|d| counts.get(d)).collect()
    };

    let start = first_day + Duration::days(1);
    let end = now.date_naive() - Duration::days(1);

    let all = submissions::exercises_per_day(&pool, student.id, None, None).await.unwrap();
    assert_eq!(read(&all), vec![3, 0, 2, 0, 1]);

    let latest = submissions::exercises_per_day(&pool, student.id, Some(start), None)
        .await
        .unwrap();
    assert_eq!(read(&latest), vec![0, 0, 2, 0, 1]);

    let earliest = submissions::exercises_per_day(&pool, student.id, None, Some(end))
        .await
        .unwrap();
    assert_eq!(read(&earliest), vec![3, 0, 2, 0, 0]);

    let middle = submissions::exercises_per_day(&pool, student.id, Some(start), Some(end))
        .await
        .unwrap();
    assert_eq!(read(&middle), vec![0, 0, 2, 0, 0]);

    // Both bounds are inclusive
    let two_days_ago = now.date_naive() - Duration::days(2);
    let single = submissions::exercises_per_day(&pool, student.id, Some(two_days_ago), Some(two_days_ago))
        .await
        .unwrap();
    assert_eq!(read(&single), vec![0, 0, 2, 0, 0]);
    assert_eq!(single.total(), 2);

    let today = now.date_naive();
    let only_today = submissions::exercises_per_day(&pool, student.id, Some(today), Some(today))
        .await
        .unwrap();
    assert_eq!(read(&only_today), vec![0, 0, 0, 0, 1]);
    assert_eq!(only_today.total(), 1);
}

struct Schedules {
    staff: User,
    student: User,
    released: User,
    current: ScheduledExercise,
    past: ScheduledExercise,
    future: ScheduledExercise,
    exam_future_exercise: Exercise,
    exam_current_exercise: Exercise,
}

async fn schedules(pool: &PgPool) -> Schedules {
    let now = Utc::now();
    let day = Duration::days(1);

    let staff = create_user(pool, Role::Staff).await;
    let student = create_user(pool, Role::Student).await;
    let released = create_user(pool, Role::Student).await;
    let class = create_current_class(pool).await;
    classes::enroll(pool, class.id, staff.id, false).await.unwrap();
    classes::enroll(pool, class.id, student.id, false).await.unwrap();
    classes::enroll(pool, class.id, released.id, true).await.unwrap();

    let current = schedule(pool, &class, &create_exercise(pool, true).await, now - day, now + day).await;
    let past = schedule(pool, &class, &create_exercise(pool, true).await, now - day * 10, now - day * 5).await;
    let future = schedule(pool, &class, &create_exercise(pool, true).await, now + day * 5, now + day * 10).await;

    let exam_future_exercise = create_exercise(pool, true).await;
    let exam_current_exercise = create_exercise(pool, true).await;
    let hour = Duration::hours(1);
    create_exam(pool, &class, now - hour, now + hour, &[&exam_current_exercise]).await;
    create_exam(pool, &class, now + day, now + day + hour, &[&exam_future_exercise]).await;

    Schedules {
        staff,
        student,
        released,
        current,
        past,
        future,
        exam_future_exercise,
        exam_current_exercise,
    }
}

#[tokio::test]
async fn staff_see_every_exercise() {
    let Some(pool) = test_pool().await else { return };
    let f = schedules(&pool).await;
    let now = Utc::now();

    let scheduled = exercises::scheduled_available_to(&pool, &f.staff, now).await.unwrap();
    let available = ids(&users::available_exercises(&pool, &f.staff, now).await.unwrap(), |e| e.id);

    for s in [&f.current, &f.past, &f.future] {
        assert!(scheduled.contains(s));
        assert!(available.contains(&s.exercise_id));
    }
    assert!(available.contains(&f.exam_future_exercise.id));
    assert!(available.contains(&f.exam_current_exercise.id));
}

#[tokio::test]
async fn student_sees_open_exercises() {
    let Some(pool) = test_pool().await else { return };
    let f = schedules(&pool).await;
    let now = Utc::now();

    let scheduled = exercises::scheduled_available_to(&pool, &f.student, now).await.unwrap();
    let available = ids(&users::available_exercises(&pool, &f.student, now).await.unwrap(), |e| e.id);

    assert_eq!(scheduled, vec![f.current.clone()]);
    assert!(available.contains(&f.current.exercise_id));
    assert!(!available.contains(&f.past.exercise_id));
    assert!(!available.contains(&f.future.exercise_id));
    assert!(!available.contains(&f.exam_future_exercise.id));
    assert!(available.contains(&f.exam_current_exercise.id));
}

#[tokio::test]
async fn released_student_also_sees_future_exercises() {
    let Some(pool) = test_pool().await else { return };
    let f = schedules(&pool).await;
    let now = Utc::now();

    let scheduled = exercises::scheduled_available_to(&pool, &f.released, now).await.unwrap();
    let available = ids(&users::available_exercises(&pool, &f.released, now).await.unwrap(), |e| e.id);

    assert!(scheduled.contains(&f.current));
    assert!(!scheduled.contains(&f.past));
    assert!(scheduled.contains(&f.future));
    assert!(available.contains(&f.current.exercise_id));
    assert!(!available.contains(&f.past.exercise_id));
    assert!(available.contains(&f.future.exercise_id));
    // Extended access does not open future exams
    assert!(!available.contains(&f.exam_future_exercise.id));
    assert!(available.contains(&f.exam_current_exercise.id));
}

#[tokio::test]
async fn released_status_is_per_enrollment() {
    let Some(pool) = test_pool().await else { return };
    let student = create_user(&pool, Role::Student).await;
    let now = Utc::now();
    let day = Duration::days(1);

    let released_class = create_current_class(&pool).await;
    let regular_class = create_current_class(&pool).await;
    classes::enroll(&pool, released_class.id, student.id, true).await.unwrap();
    classes::enroll(&pool, regular_class.id, student.id, false).await.unwrap();

    let future_in_released = schedule(
        &pool,
        &released_class,
        &create_exercise(&pool, true).await,
        now + day * 5,
        now + day * 10,
    )
    .await;
    let future_in_regular = schedule(
        &pool,
        &regular_class,
        &create_exercise(&pool, true).await,
        now + day * 5,
        now + day * 10,
    )
    .await;

    let scheduled = exercises::scheduled_available_to(&pool, &student, now).await.unwrap();
    assert!(scheduled.contains(&future_in_released));
    assert!(!scheduled.contains(&future_in_regular));

    let available = ids(&users::available_exercises(&pool, &student, now).await.unwrap(), |e| e.id);
    assert!(available.contains(&future_in_released.exercise_id));
    assert!(!available.contains(&future_in_regular.exercise_id));
}

#[tokio::test]
async fn work_is_limited_to_available_exercises() {
    let Some(pool) = test_pool().await else { return };
    let f = schedules(&pool).await;
    let now = Utc::now();

    assert!(users::can_work_on(&pool, &f.student, f.current.exercise_id, now).await.unwrap());
    assert!(users::can_work_on(&pool, &f.student, f.exam_current_exercise.id, now).await.unwrap());
    assert!(!users::can_work_on(&pool, &f.student, f.past.exercise_id, now).await.unwrap());
    assert!(!users::can_work_on(&pool, &f.student, f.exam_future_exercise.id, now).await.unwrap());

    for exercise_id in [f.past.exercise_id, f.future.exercise_id, f.exam_future_exercise.id] {
        assert!(users::can_work_on(&pool, &f.staff, exercise_id, now).await.unwrap());
    }
}

#[tokio::test]
async fn exam_availability() {
    let Some(pool) = test_pool().await else { return };
    let enrolled = create_user(&pool, Role::Student).await;
    let not_enrolled = create_user(&pool, Role::Student).await;
    let now = Utc::now();
    let hour = Duration::hours(1);

    let class = create_current_class(&pool).await;
    classes::enroll(&pool, class.id, enrolled.id, false).await.unwrap();
    let past = create_exam(&pool, &class, now - Months::new(1) - hour, now - Months::new(1) + hour, &[]).await;
    let current = create_exam(&pool, &class, now - hour, now + hour, &[]).await;

    assert!(!exams::available_to(&pool, &past, &enrolled, now).await.unwrap());
    assert!(!exams::available_to(&pool, &past, &not_enrolled, now).await.unwrap());
    assert!(exams::available_to(&pool, &current, &enrolled, now).await.unwrap());
    assert!(!exams::available_to(&pool, &current, &not_enrolled, now).await.unwrap());

    let list = users::available_exams(&pool, &enrolled, now).await.unwrap();
    assert!(list.contains(&current) && !list.contains(&past));

    let list = users::available_exams(&pool, &not_enrolled, now).await.unwrap();
    assert!(!list.contains(&current) && !list.contains(&past));
}

#[tokio::test]
async fn exam_stays_open_longer_for_students_who_need_it() {
    let Some(pool) = test_pool().await else { return };
    let regular = create_user(&pool, Role::Student).await;
    let extra_time = create_user(&pool, Role::Student).await;
    let now = Utc::now();

    let regular_class = create_current_class(&pool).await;
    let extra_time_class = create_current_class(&pool).await;
    classes::enroll(&pool, regular_class.id, regular.id, false).await.unwrap();
    classes::enroll(&pool, regular_class.id, extra_time.id, false).await.unwrap();
    classes::enroll(&pool, extra_time_class.id, extra_time.id, false).await.unwrap();

    let regular_exam = create_exam(
        &pool,
        &regular_class,
        now - Duration::hours(2),
        now - Duration::hours(1),
        &[],
    )
    .await;
    let extra_time_exam = create_exam(
        &pool,
        &extra_time_class,
        now - Duration::hours(2),
        now + Duration::hours(1),
        &[],
    )
    .await;

    assert!(!exams::available_to(&pool, &regular_exam, &regular, now).await.unwrap());
    assert!(!exams::available_to(&pool, &regular_exam, &extra_time, now).await.unwrap());
    assert!(exams::available_to(&pool, &extra_time_exam, &extra_time, now).await.unwrap());
    assert!(!exams::available_to(&pool, &extra_time_exam, &regular, now).await.unwrap());

    let list = exams::available_for(&pool, &regular, now).await.unwrap();
    assert!(list.is_empty());

    let list = exams::available_for(&pool, &extra_time, now).await.unwrap();
    assert_eq!(list, vec![extra_time_exam]);
}

#[tokio::test]
async fn interaction_follows_submission_history() {
    let Some(pool) = test_pool().await else { return };
    let exercise = create_exercise(&pool, true).await;
    let author = create_user(&pool, Role::Student).await;
    let now = Utc::now();

    // First attempt
    let first = submit(&pool, &author, &exercise, Outcome::Error, now).await;
    let interaction = interactions::get(&pool, author.id, exercise.id).await.unwrap().unwrap();
    assert_eq!(interaction.attempts, 1);
    assert_eq!(interaction.best_outcome(), Outcome::Error);

    // Second attempt
    let second = submit(&pool, &author, &exercise, Outcome::Error, now).await;
    let interaction = interactions::get(&pool, author.id, exercise.id).await.unwrap().unwrap();
    assert_eq!(interaction.attempts, 2);
    assert_eq!(interaction.best_outcome(), Outcome::Error);

    // Correcting the second attempt
    submissions::update(
        &pool,
        second.id,
        &UpdateSubmissionRequest {
            outcome: Some(Outcome::Ok),
            failures: None,
            stack_traces: None,
        },
    )
    .await
    .unwrap();
    let interaction = interactions::get(&pool, author.id, exercise.id).await.unwrap().unwrap();
    assert_eq!(interaction.attempts, 2);
    assert_eq!(interaction.best_outcome(), Outcome::Ok);

    // Deleting it drops both the attempt and the success
    submissions::soft_delete(&pool, second.id).await.unwrap();
    let interaction = interactions::get(&pool, author.id, exercise.id).await.unwrap().unwrap();
    assert_eq!(interaction.attempts, 1);
    assert_eq!(interaction.best_outcome(), Outcome::Error);

    // No live submissions left, no record
    submissions::soft_delete(&pool, first.id).await.unwrap();
    assert!(interactions::get(&pool, author.id, exercise.id).await.unwrap().is_none());
}
