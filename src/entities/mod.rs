pub mod customer;
pub mod delivery_note;
pub mod delivery_note_line;
pub mod goods_receipt;
pub mod goods_receipt_line;
pub mod item_master;
pub mod purchase_return;
pub mod purchase_return_line;
pub mod sales_return;
pub mod sales_return_line;
pub mod supplier;
pub mod supplier_offer;
pub mod warehouse;
pub mod warehouse_stock;
