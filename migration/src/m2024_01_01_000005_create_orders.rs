//! Migration to create the orders and order_items tables.
//!
//! Order items snapshot the product name and unit price at checkout so that
//! later catalog edits or deletions do not rewrite order history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Orders::UserId).uuid().null())
                    .col(ColumnDef::new(Orders::OrderNumber).text().not_null())
                    .col(ColumnDef::new(Orders::CustomerEmail).text().not_null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .text()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .text()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Orders::Subtotal).double().not_null())
                    .col(ColumnDef::new(Orders::TaxAmount).double().not_null())
                    .col(ColumnDef::new(Orders::ShippingAmount).double().not_null())
                    .col(ColumnDef::new(Orders::DiscountAmount).double().not_null())
                    .col(ColumnDef::new(Orders::Total).double().not_null())
                    .col(
                        ColumnDef::new(Orders::ShippingAddress)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::BillingAddress).json_binary().null())
                    .col(ColumnDef::new(Orders::PaymentMethod).text().null())
                    .col(ColumnDef::new(Orders::TrackingNumber).text().null())
                    .col(ColumnDef::new(Orders::ShippingMethod).text().null())
                    .col(
                        ColumnDef::new(Orders::ShippedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::DeliveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Orders::CustomerNotes).text().null())
                    .col(ColumnDef::new(Orders::AdminNotes).text().null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_tenant_id")
                            .from(Orders::Table, Orders::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_user_id")
                            .from(Orders::Table, Orders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_order_number")
                    .table(Orders::Table)
                    .col(Orders::OrderNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_tenant_created")
                    .table(Orders::Table)
                    .col(Orders::TenantId)
                    .col(Orders::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                    .col(ColumnDef::new(OrderItems::ProductId).uuid().null())
                    .col(ColumnDef::new(OrderItems::ProductName).text().not_null())
                    .col(ColumnDef::new(OrderItems::Sku).text().null())
                    .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                    .col(ColumnDef::new(OrderItems::UnitPrice).double().not_null())
                    .col(ColumnDef::new(OrderItems::Total).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order_id")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_product_id")
                            .from(OrderItems::Table, OrderItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    TenantId,
    UserId,
    OrderNumber,
    CustomerEmail,
    Status,
    PaymentStatus,
    Subtotal,
    TaxAmount,
    ShippingAmount,
    DiscountAmount,
    Total,
    ShippingAddress,
    BillingAddress,
    PaymentMethod,
    TrackingNumber,
    ShippingMethod,
    ShippedAt,
    DeliveredAt,
    CustomerNotes,
    AdminNotes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    ProductName,
    Sku,
    Quantity,
    UnitPrice,
    Total,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}
