use quiz_core::model::{Category, CategoryStat, Question, QuestionId};

use super::{
    SqliteRepository,
    mapping::{QUESTION_COLUMNS, conn, id_i64, map_category_stat_row, map_question_row},
};
use crate::repository::{QuestionStore, StorageError};

fn map_questions(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Question>, StorageError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(map_question_row(&row)?);
    }
    Ok(out)
}

#[async_trait::async_trait]
impl QuestionStore for SqliteRepository {
    async fn fetch_all_active(&self) -> Result<Vec<Question>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE is_active = 1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        map_questions(rows)
    }

    async fn fetch_by_category(&self, category: &Category) -> Result<Vec<Question>, StorageError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE is_active = 1 AND category = ?1 ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        map_questions(rows)
    }

    async fn fetch_category_stats(&self) -> Result<Vec<CategoryStat>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT category, total_questions, correct_answers, last_updated
                FROM category_stats
                ORDER BY rowid ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_category_stat_row(&row)?);
        }
        Ok(out)
    }

    async fn fetch_by_id(&self, id: QuestionId) -> Result<Question, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("question_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_question_row(&row)
    }

    async fn fetch_candidates(
        &self,
        category: Option<&Category>,
        exclude: &[QuestionId],
        limit: usize,
    ) -> Result<Vec<Question>, StorageError> {
        let mut sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE is_active = 1");

        let mut bind_index = 1;
        if category.is_some() {
            sql.push_str(" AND category = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if !exclude.is_empty() {
            sql.push_str(" AND id NOT IN (");
            for i in 0..exclude.len() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push('?');
                sql.push_str(&bind_index.to_string());
                bind_index += 1;
            }
            sql.push(')');
        }
        sql.push_str(" ORDER BY id ASC LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql);
        if let Some(category) = category {
            query = query.bind(category.as_str());
        }
        for id in exclude {
            query = query.bind(id_i64("question_id", id.value())?);
        }
        query = query.bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        map_questions(rows)
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let [a, b, c, d] = &question.options;
        sqlx::query(
            r"
                INSERT INTO questions (
                    id, category, question_he, question_fa,
                    option_a_he, option_a_fa, option_b_he, option_b_fa,
                    option_c_he, option_c_fa, option_d_he, option_d_fa,
                    correct_answer, explanation_he, explanation_fa, is_active
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                ON CONFLICT(id) DO UPDATE SET
                    category = excluded.category,
                    question_he = excluded.question_he,
                    question_fa = excluded.question_fa,
                    option_a_he = excluded.option_a_he,
                    option_a_fa = excluded.option_a_fa,
                    option_b_he = excluded.option_b_he,
                    option_b_fa = excluded.option_b_fa,
                    option_c_he = excluded.option_c_he,
                    option_c_fa = excluded.option_c_fa,
                    option_d_he = excluded.option_d_he,
                    option_d_fa = excluded.option_d_fa,
                    correct_answer = excluded.correct_answer,
                    explanation_he = excluded.explanation_he,
                    explanation_fa = excluded.explanation_fa,
                    is_active = excluded.is_active
            ",
        )
        .bind(id_i64("question_id", question.id.value())?)
        .bind(question.category.as_str())
        .bind(question.prompt.hebrew())
        .bind(question.prompt.persian())
        .bind(a.hebrew())
        .bind(a.persian())
        .bind(b.hebrew())
        .bind(b.persian())
        .bind(c.hebrew())
        .bind(c.persian())
        .bind(d.hebrew())
        .bind(d.persian())
        .bind(i64::from(question.correct_option.value()))
        .bind(question.explanation.hebrew())
        .bind(question.explanation.persian())
        .bind(question.active)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
