//! Core schema for The Big Tip.
//!
//! - `users`: accounts, profile fields, MFA secret, admin flag
//! - `competitions`: tipping leagues (public or invite-only)
//! - `competition_users`: membership rows with role and running score
//! - `events`: sporting events members pick outcomes for
//! - `picks`: one selection per (user, event, competition)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub(crate) enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    DisplayName,
    Bio,
    FavoriteSport,
    MfaSecret,
    MfaEnabled,
    IsAdmin,
    CreatedAt,
}

#[derive(Iden)]
pub(crate) enum Competitions {
    Table,
    Id,
    Name,
    Description,
    IsPublic,
    InviteCode,
    Status,
    StartsAt,
    EndsAt,
    EntryFeeMinor,
    PrizePoolMinor,
    OwnerId,
    CreatedAt,
}

#[derive(Iden)]
enum CompetitionUsers {
    Table,
    CompetitionId,
    UserId,
    Role,
    Score,
    JoinedAt,
}

#[derive(Iden)]
enum Events {
    Table,
    Id,
    CompetitionId,
    Sport,
    Title,
    Options,
    EventDate,
    Status,
    Winner,
    Points,
    CreatedAt,
}

#[derive(Iden)]
enum Picks {
    Table,
    Id,
    UserId,
    EventId,
    CompetitionId,
    Selection,
    IsCorrect,
    PointsAwarded,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string())
                    .col(ColumnDef::new(Users::Bio).string())
                    .col(ColumnDef::new(Users::FavoriteSport).string())
                    .col(ColumnDef::new(Users::MfaSecret).string())
                    .col(
                        ColumnDef::new(Users::MfaEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-username-unique")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-email-unique")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Competitions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Competitions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Competitions::Name).string().not_null())
                    .col(ColumnDef::new(Competitions::Description).string())
                    .col(ColumnDef::new(Competitions::IsPublic).boolean().not_null())
                    .col(ColumnDef::new(Competitions::InviteCode).string().not_null())
                    .col(
                        ColumnDef::new(Competitions::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Competitions::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Competitions::EndsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Competitions::EntryFeeMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Competitions::PrizePoolMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Competitions::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(Competitions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-competitions-owner_id")
                            .from(Competitions::Table, Competitions::OwnerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-competitions-invite_code-unique")
                    .table(Competitions::Table)
                    .col(Competitions::InviteCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CompetitionUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CompetitionUsers::CompetitionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CompetitionUsers::UserId).string().not_null())
                    .col(
                        ColumnDef::new(CompetitionUsers::Role)
                            .string()
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(CompetitionUsers::Score)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CompetitionUsers::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CompetitionUsers::CompetitionId)
                            .col(CompetitionUsers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-competition_users-competition_id")
                            .from(CompetitionUsers::Table, CompetitionUsers::CompetitionId)
                            .to(Competitions::Table, Competitions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-competition_users-user_id")
                            .from(CompetitionUsers::Table, CompetitionUsers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-competition_users-user_id")
                    .table(CompetitionUsers::Table)
                    .col(CompetitionUsers::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Events::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Events::CompetitionId).string().not_null())
                    .col(ColumnDef::new(Events::Sport).string().not_null())
                    .col(ColumnDef::new(Events::Title).string().not_null())
                    .col(ColumnDef::new(Events::Options).text().not_null())
                    .col(
                        ColumnDef::new(Events::EventDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Events::Status)
                            .string()
                            .not_null()
                            .default("upcoming"),
                    )
                    .col(ColumnDef::new(Events::Winner).string())
                    .col(
                        ColumnDef::new(Events::Points)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Events::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-events-competition_id")
                            .from(Events::Table, Events::CompetitionId)
                            .to(Competitions::Table, Competitions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-events-competition_id-event_date")
                    .table(Events::Table)
                    .col(Events::CompetitionId)
                    .col(Events::EventDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Picks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Picks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Picks::UserId).string().not_null())
                    .col(ColumnDef::new(Picks::EventId).string().not_null())
                    .col(ColumnDef::new(Picks::CompetitionId).string().not_null())
                    .col(ColumnDef::new(Picks::Selection).string().not_null())
                    .col(ColumnDef::new(Picks::IsCorrect).boolean())
                    .col(
                        ColumnDef::new(Picks::PointsAwarded)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Picks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Picks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-picks-user_id")
                            .from(Picks::Table, Picks::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-picks-event_id")
                            .from(Picks::Table, Picks::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-picks-competition_id")
                            .from(Picks::Table, Picks::CompetitionId)
                            .to(Competitions::Table, Competitions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The only guard against duplicate picks under concurrent writes.
        manager
            .create_index(
                Index::create()
                    .name("idx-picks-user_id-event_id-competition_id-unique")
                    .table(Picks::Table)
                    .col(Picks::UserId)
                    .col(Picks::EventId)
                    .col(Picks::CompetitionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Picks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CompetitionUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Competitions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
