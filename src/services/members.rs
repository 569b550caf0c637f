//! Member management service

use crate::{
    error::{AppError, AppResult},
    models::{
        form::FormErrors,
        member::{Member, MemberForm, MemberWithActiveLoans},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All members with their number of loans still out
    pub async fn list_members(&self) -> AppResult<Vec<MemberWithActiveLoans>> {
        self.repository.members.list_with_active_loans().await
    }

    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    /// Validate and register a member. New members are always active.
    pub async fn create_member(&self, form: &MemberForm) -> AppResult<Member> {
        let mut input = form.clean()?;
        input.active = true;

        if self.repository.members.email_exists(&input.email, None).await? {
            return Err(duplicate_email());
        }

        let member = self.repository.members.create(&input).await?;
        tracing::info!(member_id = member.id, "Member registered");
        Ok(member)
    }

    /// Validate and update a member, including the active flag
    pub async fn update_member(&self, id: i32, form: &MemberForm) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await?;
        let input = form.clean()?;

        if self
            .repository
            .members
            .email_exists(&input.email, Some(id))
            .await?
        {
            return Err(duplicate_email());
        }

        let member = self.repository.members.update(id, &input).await?;
        tracing::info!(member_id = member.id, active = member.active, "Member updated");
        Ok(member)
    }

    /// Delete a member unless they still have a book out
    pub async fn delete_member(&self, id: i32) -> AppResult<Member> {
        match self.repository.members.delete(id).await {
            Ok(member) => {
                tracing::info!(member_id = id, "Member deleted");
                Ok(member)
            }
            Err(AppError::BusinessRule(msg)) => {
                tracing::warn!(member_id = id, "Member delete refused: {}", msg);
                Err(AppError::BusinessRule(msg))
            }
            Err(e) => Err(e),
        }
    }
}

fn duplicate_email() -> AppError {
    AppError::Validation(FormErrors::field(
        "email",
        "Member with this email already exists.",
    ))
}
